use super::{CandidateFeatures, MethodScorer, ScoringContext};
use crate::types::{RecommendationMethod, Room, SimilarityBreakdown};

/// Log-scaled click count relative to the most popular candidate
#[derive(Debug, Clone, Copy, Default)]
pub struct PopularityScorer;

impl PopularityScorer {
    pub fn normalized(count: u64, max_count: u64) -> f64 {
        if max_count == 0 {
            return 0.0;
        }
        let count = count.min(max_count) as f64;
        (count.ln_1p() / (max_count as f64).ln_1p()).clamp(0.0, 1.0)
    }
}

impl MethodScorer for PopularityScorer {
    fn method(&self) -> RecommendationMethod {
        RecommendationMethod::Popularity
    }

    fn score_features(
        &self,
        candidate: &Room,
        features: &CandidateFeatures,
        ctx: &ScoringContext,
    ) -> (f64, SimilarityBreakdown) {
        let count = ctx.popularity.get(&candidate.id).copied().unwrap_or(0);
        let breakdown = features.breakdown(Self::normalized(count, ctx.max_popularity));
        (breakdown.overall, breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::test_support::{context, room};
    use std::collections::HashMap;

    #[test]
    fn test_normalized_counts() {
        assert_eq!(PopularityScorer::normalized(0, 0), 0.0);
        assert_eq!(PopularityScorer::normalized(0, 50), 0.0);
        assert_eq!(PopularityScorer::normalized(50, 50), 1.0);

        let mid = PopularityScorer::normalized(7, 63);
        // ln(8) / ln(64) = 0.5
        assert!((mid - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_room_scores_zero() {
        let target = room(1, 0.0, 3_000_000.0, 25.0, &[]);
        let hot = room(2, 1.0, 3_000_000.0, 25.0, &[]);
        let cold = room(3, 1.0, 3_000_000.0, 25.0, &[]);
        let ctx = context(&target).with_popularity(HashMap::from([(2, 40)]));

        let (hot_score, breakdown) = PopularityScorer.score(&target, &hot, &ctx);
        let (cold_score, _) = PopularityScorer.score(&target, &cold, &ctx);

        assert_eq!(hot_score, 1.0);
        assert_eq!(cold_score, 0.0);
        assert_eq!(breakdown.price, 1.0);
    }
}
