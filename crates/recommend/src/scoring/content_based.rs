use super::{CandidateFeatures, MethodScorer, ScoringContext};
use crate::types::{RecommendationMethod, Room, SimilarityBreakdown};

/// Weighted blend of location, price, area and amenity similarity
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentBasedScorer;

impl MethodScorer for ContentBasedScorer {
    fn method(&self) -> RecommendationMethod {
        RecommendationMethod::ContentBased
    }

    fn score_features(
        &self,
        _candidate: &Room,
        features: &CandidateFeatures,
        ctx: &ScoringContext,
    ) -> (f64, SimilarityBreakdown) {
        let overall = ctx.weights.combine(
            features.location,
            features.price,
            features.area,
            features.amenities,
        );
        let breakdown = features.breakdown(overall);
        (breakdown.overall, breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::test_support::{context, room};
    use crate::weights::SimilarityWeights;

    #[test]
    fn test_price_similarity_extremes() {
        let target = room(1, 0.0, 3_000_000.0, 25.0, &[]);
        let same = room(2, 1.0, 3_000_000.0, 25.0, &[]);
        let pricey = room(3, 1.0, 10_000_000.0, 25.0, &[]);
        let ctx = context(&target);

        let (_, same_breakdown) = ContentBasedScorer.score(&target, &same, &ctx);
        let (_, pricey_breakdown) = ContentBasedScorer.score(&target, &pricey, &ctx);

        assert_eq!(same_breakdown.price, 1.0);
        assert_eq!(pricey_breakdown.price, 0.0);
    }

    #[test]
    fn test_overall_stays_in_unit_interval() {
        let target = room(1, 0.0, 3_000_000.0, 25.0, &[1, 2, 3]);
        let ctx_weights = [
            SimilarityWeights::default(),
            SimilarityWeights::new(1.0, 0.0, 0.0, 0.0).unwrap(),
            SimilarityWeights::new(0.0, 0.0, 0.0, 1.0).unwrap(),
            SimilarityWeights::new(0.25, 0.25, 0.25, 0.25).unwrap(),
        ];

        let candidates = [
            room(2, 0.0, 3_000_000.0, 25.0, &[1, 2, 3]),
            room(3, 9.9, 1.0, 1.0, &[]),
            room(4, 3.0, 3_500_000.0, 40.0, &[2, 9]),
        ];

        for weights in ctx_weights {
            let mut ctx = context(&target);
            ctx.weights = weights;
            for candidate in &candidates {
                let (score, breakdown) = ContentBasedScorer.score(&target, candidate, &ctx);
                assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
                assert_eq!(score, breakdown.overall);
            }
        }
    }

    #[test]
    fn test_more_shared_amenities_rank_higher() {
        let target = room(1, 0.0, 3_000_000.0, 25.0, &[1, 2, 3, 4, 5]);
        let sharing = room(2, 2.0, 3_000_000.0, 25.0, &[1, 2, 3]);
        let bare = room(3, 2.0, 3_000_000.0, 25.0, &[]);
        let ctx = context(&target);

        let (with_amenities, _) = ContentBasedScorer.score(&target, &sharing, &ctx);
        let (without, _) = ContentBasedScorer.score(&target, &bare, &ctx);
        assert!(with_amenities > without);
    }
}
