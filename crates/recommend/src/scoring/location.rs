use super::{CandidateFeatures, MethodScorer, ScoringContext};
use crate::types::{RecommendationMethod, Room, SimilarityBreakdown};

/// Ranks purely by proximity; other dimensions are kept for explanations
#[derive(Debug, Clone, Copy, Default)]
pub struct LocationBasedScorer;

impl MethodScorer for LocationBasedScorer {
    fn method(&self) -> RecommendationMethod {
        RecommendationMethod::LocationBased
    }

    fn score_features(
        &self,
        _candidate: &Room,
        features: &CandidateFeatures,
        _ctx: &ScoringContext,
    ) -> (f64, SimilarityBreakdown) {
        let breakdown = features.breakdown(features.location);
        (breakdown.overall, breakdown)
    }
}
