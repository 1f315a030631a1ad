//! Human-readable reasons for a recommendation

use crate::types::{
    RecommendationExplanation, RecommendationMethod, Room, SimilarityBreakdown,
};
use std::collections::HashSet;

/// Maps a similarity breakdown to an ordered list of reasons
///
/// Reasons follow a fixed order: location, price, area, amenities. Distance
/// and the price/area differences are always filled in, whether or not they
/// produced a reason.
#[derive(Debug, Clone, Copy)]
pub struct ExplanationGenerator {
    threshold: f64,
}

impl ExplanationGenerator {
    pub fn new(materiality_threshold: f64) -> Self {
        Self {
            threshold: materiality_threshold,
        }
    }

    pub fn explain(
        &self,
        method: RecommendationMethod,
        target: &Room,
        candidate: &Room,
        breakdown: &SimilarityBreakdown,
        distance_km: f64,
    ) -> RecommendationExplanation {
        let price_difference = candidate.price - target.price;
        let area_difference = candidate.area - target.area;
        let common_amenities = common_amenity_names(target, candidate);

        let mut reasons = Vec::new();

        if breakdown.location > self.threshold {
            reasons.push(format!("Close by: {:.1} km away", distance_km));
        }

        if breakdown.price > self.threshold {
            reasons.push(describe_difference(
                "Similar price",
                "Same price as this room",
                price_difference,
                target.price,
                ("cheaper", "more expensive"),
            ));
        }

        if breakdown.area > self.threshold {
            reasons.push(describe_difference(
                "Similar size",
                "Same size as this room",
                area_difference,
                target.area,
                ("smaller", "larger"),
            ));
        }

        if !common_amenities.is_empty() {
            let noun = if common_amenities.len() == 1 {
                "amenity"
            } else {
                "amenities"
            };
            reasons.push(format!(
                "Shares {} {}: {}",
                common_amenities.len(),
                noun,
                common_amenities.join(", ")
            ));
        }

        if reasons.is_empty() {
            reasons.push(fallback_reason(method).to_string());
        }

        RecommendationExplanation {
            reasons,
            distance: Some(distance_km),
            price_difference: Some(price_difference),
            area_difference: Some(area_difference),
            common_amenities,
        }
    }
}

fn describe_difference(
    label: &str,
    identical: &str,
    difference: f64,
    reference: f64,
    (below, above): (&str, &str),
) -> String {
    if difference == 0.0 {
        return identical.to_string();
    }

    let direction = if difference < 0.0 { below } else { above };
    if reference > 0.0 {
        format!(
            "{}: {:.0}% {} than this room",
            label,
            difference.abs() / reference * 100.0,
            direction
        )
    } else {
        format!("{}: slightly {}", label, direction)
    }
}

/// Names of the candidate's amenities also present on the target, in the
/// target's order
fn common_amenity_names(target: &Room, candidate: &Room) -> Vec<String> {
    let candidate_ids: HashSet<_> = candidate.amenities.iter().map(|a| a.id).collect();
    target
        .amenities
        .iter()
        .filter(|a| candidate_ids.contains(&a.id))
        .map(|a| a.name.clone())
        .collect()
}

fn fallback_reason(method: RecommendationMethod) -> &'static str {
    match method {
        RecommendationMethod::Popularity => "Popular with other renters",
        RecommendationMethod::Collaborative => "Often viewed together with this room",
        RecommendationMethod::ContentBased
        | RecommendationMethod::LocationBased
        | RecommendationMethod::Hybrid => "Recommended for you",
    }
}
