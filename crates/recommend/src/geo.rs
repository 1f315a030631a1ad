//! Great-circle distance and bounding-box prefilter

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// Absorbs float error at the box edges; the exact haversine check follows.
const BOX_PADDING_DEG: f64 = 1e-6;

/// Haversine distance in kilometres between two lat/lng pairs
///
/// Callers pass finite coordinates within the usual ranges; no validation is
/// performed here.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();

    (EARTH_RADIUS_KM * c).max(0.0)
}

/// Axis-aligned lat/lng box that contains every point within a radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Smallest box containing the spherical cap of `radius_km` around a point
    ///
    /// Falls back to the full longitude range when the cap reaches a pole or
    /// crosses the antimeridian.
    pub fn around(lat: f64, lng: f64, radius_km: f64) -> Self {
        let angular = (radius_km.max(0.0) / EARTH_RADIUS_KM).min(std::f64::consts::PI);
        let d_lat = angular.to_degrees();

        let min_lat = lat - d_lat - BOX_PADDING_DEG;
        let max_lat = lat + d_lat + BOX_PADDING_DEG;

        if min_lat <= -90.0 || max_lat >= 90.0 {
            return Self {
                min_lat: min_lat.max(-90.0),
                max_lat: max_lat.min(90.0),
                min_lng: -180.0,
                max_lng: 180.0,
            };
        }

        let ratio = angular.sin() / lat.to_radians().cos();
        if ratio.is_nan() || ratio >= 1.0 {
            return Self {
                min_lat,
                max_lat,
                min_lng: -180.0,
                max_lng: 180.0,
            };
        }

        let d_lng = ratio.asin().to_degrees() + BOX_PADDING_DEG;
        let (min_lng, max_lng) = (lng - d_lng, lng + d_lng);

        if min_lng < -180.0 || max_lng > 180.0 {
            return Self {
                min_lat,
                max_lat,
                min_lng: -180.0,
                max_lng: 180.0,
            };
        }

        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Hanoi Old Quarter and West Lake, roughly 4.6 km apart
    const HOAN_KIEM: (f64, f64) = (21.0285, 105.8542);
    const WEST_LAKE: (f64, f64) = (21.0580, 105.8227);

    #[test]
    fn test_identical_points_are_zero() {
        assert_eq!(distance_km(HOAN_KIEM.0, HOAN_KIEM.1, HOAN_KIEM.0, HOAN_KIEM.1), 0.0);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let ab = distance_km(HOAN_KIEM.0, HOAN_KIEM.1, WEST_LAKE.0, WEST_LAKE.1);
        let ba = distance_km(WEST_LAKE.0, WEST_LAKE.1, HOAN_KIEM.0, HOAN_KIEM.1);
        assert!((ab - ba).abs() < 1e-12);
        assert!(ab > 4.0 && ab < 5.0, "unexpected distance {}", ab);
    }

    #[test]
    fn test_one_degree_of_latitude() {
        let d = distance_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.19).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn test_antipodal_points() {
        let d = distance_km(0.0, 0.0, 0.0, 180.0);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_bounding_box_contains_points_within_radius() {
        let radius = 5.0;
        let bbox = BoundingBox::around(HOAN_KIEM.0, HOAN_KIEM.1, radius);

        for step in 0..36 {
            let bearing = (step as f64 * 10.0).to_radians();
            // Walk just inside the radius along each bearing
            let fraction = 0.999 * radius / EARTH_RADIUS_KM;
            let lat = HOAN_KIEM.0 + (fraction * bearing.cos()).to_degrees();
            let lng = HOAN_KIEM.1
                + (fraction * bearing.sin() / HOAN_KIEM.0.to_radians().cos()).to_degrees();

            if distance_km(HOAN_KIEM.0, HOAN_KIEM.1, lat, lng) <= radius {
                assert!(bbox.contains(lat, lng), "bearing {} escaped the box", step * 10);
            }
        }
    }

    #[test]
    fn test_bounding_box_excludes_far_points() {
        let bbox = BoundingBox::around(HOAN_KIEM.0, HOAN_KIEM.1, 1.0);
        assert!(!bbox.contains(WEST_LAKE.0, WEST_LAKE.1));
    }

    #[test]
    fn test_bounding_box_near_pole_spans_all_longitudes() {
        let bbox = BoundingBox::around(89.99, 10.0, 50.0);
        assert_eq!(bbox.min_lng, -180.0);
        assert_eq!(bbox.max_lng, 180.0);
        assert_eq!(bbox.max_lat, 90.0);
    }

    #[test]
    fn test_bounding_box_across_antimeridian() {
        let bbox = BoundingBox::around(0.0, 179.99, 10.0);
        assert!(bbox.contains(0.0, -179.99));
    }
}
