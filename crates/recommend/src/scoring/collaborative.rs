use super::{CandidateFeatures, ContentBasedScorer, MethodScorer, ScoringContext};
use crate::types::{RecommendationMethod, Room, SimilarityBreakdown};

/// Co-occurrence strength with the target room
///
/// Candidates without co-occurrence data fall back to their content score
/// scaled by the damping factor, so cold-start rooms stay rankable.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollaborativeScorer;

impl MethodScorer for CollaborativeScorer {
    fn method(&self) -> RecommendationMethod {
        RecommendationMethod::Collaborative
    }

    fn score_features(
        &self,
        candidate: &Room,
        features: &CandidateFeatures,
        ctx: &ScoringContext,
    ) -> (f64, SimilarityBreakdown) {
        let strength = ctx
            .co_occurrence
            .get(&candidate.id)
            .copied()
            .filter(|s| s.is_finite() && *s > 0.0);

        let overall = match strength {
            Some(strength) => strength.min(1.0),
            None => {
                let (content, _) = ContentBasedScorer.score_features(candidate, features, ctx);
                content * ctx.collaborative_damping
            }
        };

        let breakdown = features.breakdown(overall);
        (breakdown.overall, breakdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::test_support::{context, room};
    use std::collections::HashMap;

    #[test]
    fn test_uses_co_occurrence_when_present() {
        let target = room(1, 0.0, 3_000_000.0, 25.0, &[]);
        let candidate = room(2, 9.0, 9_000_000.0, 90.0, &[]);
        let ctx = context(&target).with_co_occurrence(HashMap::from([(2, 0.85)]));

        let (score, _) = CollaborativeScorer.score(&target, &candidate, &ctx);
        assert_eq!(score, 0.85);
    }

    #[test]
    fn test_strength_is_clamped() {
        let target = room(1, 0.0, 3_000_000.0, 25.0, &[]);
        let candidate = room(2, 1.0, 3_000_000.0, 25.0, &[]);
        let ctx = context(&target).with_co_occurrence(HashMap::from([(2, 7.5)]));

        let (score, _) = CollaborativeScorer.score(&target, &candidate, &ctx);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_missing_data_falls_back_to_damped_content() {
        let target = room(1, 0.0, 3_000_000.0, 25.0, &[1]);
        let candidate = room(2, 2.0, 3_200_000.0, 22.0, &[1, 2]);
        let ctx = context(&target).with_co_occurrence(HashMap::from([(2, 0.0)]));

        let (content, _) = ContentBasedScorer.score(&target, &candidate, &ctx);
        let (score, _) = CollaborativeScorer.score(&target, &candidate, &ctx);

        assert!(content > 0.0);
        assert!((score - content * 0.5).abs() < 1e-12);
    }
}
