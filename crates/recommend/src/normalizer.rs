//! Feature normalization
//!
//! Converts raw attribute differences into bounded [0, 1] similarities where
//! 1 means identical and 0 means maximally dissimilar for the tolerance.

use crate::types::AmenityId;
use std::collections::HashSet;

/// Price similarity within a relative tolerance window
pub fn price_similarity(target: f64, candidate: f64, variance_fraction: f64) -> f64 {
    relative_similarity(target, candidate, variance_fraction)
}

/// Area similarity within a relative tolerance window
pub fn area_similarity(target: f64, candidate: f64, variance_fraction: f64) -> f64 {
    relative_similarity(target, candidate, variance_fraction)
}

/// Linear decay from 1 at the target to 0 at `max_distance_km`
pub fn location_similarity(distance_km: f64, max_distance_km: f64) -> f64 {
    if max_distance_km.is_nan() || max_distance_km <= 0.0 {
        return if distance_km <= 0.0 { 1.0 } else { 0.0 };
    }
    sanitize(1.0 - distance_km / max_distance_km)
}

/// Jaccard index over amenity ids; two empty sets are a neutral match
pub fn amenity_similarity(target: &HashSet<AmenityId>, candidate: &HashSet<AmenityId>) -> f64 {
    if target.is_empty() && candidate.is_empty() {
        return 1.0;
    }

    let intersection = target.intersection(candidate).count();
    let union = target.union(candidate).count();

    intersection as f64 / union as f64
}

fn relative_similarity(target: f64, candidate: f64, tolerance: f64) -> f64 {
    let window = target * tolerance;
    let difference = (target - candidate).abs();

    if !window.is_finite() || window <= 0.0 {
        return if difference == 0.0 { 1.0 } else { 0.0 };
    }

    sanitize(1.0 - difference / window)
}

/// Clamp to [0, 1], mapping NaN to 0
pub(crate) fn sanitize(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
