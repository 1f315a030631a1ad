//! Hybrid blending and deterministic ranking

use crate::error::RecommendationError;
use crate::scoring::ScoredCandidate;
use crate::weights::HybridWeights;
use std::cmp::Ordering;

/// Blends method scores under validated hybrid weights and ranks candidates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridAggregator {
    weights: HybridWeights,
}

/// Candidate with its 1-based position in the response
#[derive(Debug, Clone, PartialEq)]
pub struct RankedCandidate {
    pub rank: usize,
    pub candidate: ScoredCandidate,
}

impl HybridAggregator {
    pub fn new(weights: HybridWeights) -> Result<Self, RecommendationError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Aggregator for weights already checked with a custom epsilon
    pub(crate) fn prevalidated(weights: HybridWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &HybridWeights {
        &self.weights
    }

    pub fn blend(&self, content_based: f64, popularity: f64, collaborative: f64) -> f64 {
        self.weights.content_based * content_based
            + self.weights.popularity * popularity
            + self.weights.collaborative * collaborative
    }

    /// Sort, truncate to `limit` and assign contiguous ranks from 1
    ///
    /// Order: score descending, then the secondary key descending, then
    /// distance ascending, then room id ascending.
    pub fn rank(&self, mut scored: Vec<ScoredCandidate>, limit: usize) -> Vec<RankedCandidate> {
        scored.sort_by(compare_candidates);
        scored.truncate(limit);

        scored
            .into_iter()
            .enumerate()
            .map(|(position, candidate)| RankedCandidate {
                rank: position + 1,
                candidate,
            })
            .collect()
    }
}

fn compare_candidates(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.tie_breaker.total_cmp(&a.tie_breaker))
        .then_with(|| a.distance_km.total_cmp(&b.distance_km))
        .then_with(|| a.room_id.cmp(&b.room_id))
}
