//! Per-method candidate scoring
//!
//! Every scorer is a pure function of (target, candidate, context). HYBRID has
//! no scorer of its own; it blends the content, popularity and collaborative
//! scores through the [`HybridAggregator`].

mod collaborative;
mod content_based;
mod location;
mod popularity;

pub use collaborative::CollaborativeScorer;
pub use content_based::ContentBasedScorer;
pub use location::LocationBasedScorer;
pub use popularity::PopularityScorer;

use crate::aggregator::HybridAggregator;
use crate::error::RecommendationError;
use crate::geo::distance_km;
use crate::normalizer;
use crate::types::{AmenityId, RecommendationMethod, Room, RoomId, SimilarityBreakdown};
use crate::weights::SimilarityWeights;
use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Request-scoped inputs shared by every scorer
#[derive(Debug, Clone)]
pub struct ScoringContext {
    pub weights: SimilarityWeights,
    pub hybrid: HybridAggregator,
    pub price_variance: f64,
    pub area_variance: f64,
    /// Radius at which location similarity reaches 0
    pub max_distance_km: f64,
    pub collaborative_damping: f64,
    pub target_amenities: HashSet<AmenityId>,
    pub popularity: HashMap<RoomId, u64>,
    /// Largest popularity count among the candidates
    pub max_popularity: u64,
    pub co_occurrence: HashMap<RoomId, f64>,
}

impl ScoringContext {
    pub fn new(
        target: &Room,
        weights: SimilarityWeights,
        hybrid: HybridAggregator,
        price_variance: f64,
        area_variance: f64,
        max_distance_km: f64,
        collaborative_damping: f64,
    ) -> Self {
        Self {
            weights,
            hybrid,
            price_variance,
            area_variance,
            max_distance_km,
            collaborative_damping,
            target_amenities: target.amenity_ids(),
            popularity: HashMap::new(),
            max_popularity: 0,
            co_occurrence: HashMap::new(),
        }
    }

    pub fn with_popularity(mut self, popularity: HashMap<RoomId, u64>) -> Self {
        self.max_popularity = popularity.values().copied().max().unwrap_or(0);
        self.popularity = popularity;
        self
    }

    pub fn with_co_occurrence(mut self, co_occurrence: HashMap<RoomId, f64>) -> Self {
        self.co_occurrence = co_occurrence;
        self
    }
}

/// Normalized per-dimension similarities for one candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateFeatures {
    pub distance_km: f64,
    pub location: f64,
    pub price: f64,
    pub area: f64,
    pub amenities: f64,
}

impl CandidateFeatures {
    pub fn extract(target: &Room, candidate: &Room, ctx: &ScoringContext) -> Self {
        let distance = distance_km(
            target.latitude(),
            target.longitude(),
            candidate.latitude(),
            candidate.longitude(),
        );

        Self {
            distance_km: distance,
            location: normalizer::location_similarity(distance, ctx.max_distance_km),
            price: normalizer::price_similarity(target.price, candidate.price, ctx.price_variance),
            area: normalizer::area_similarity(target.area, candidate.area, ctx.area_variance),
            amenities: normalizer::amenity_similarity(
                &ctx.target_amenities,
                &candidate.amenity_ids(),
            ),
        }
    }

    /// Breakdown carrying these features and the given overall score
    pub fn breakdown(&self, overall: f64) -> SimilarityBreakdown {
        SimilarityBreakdown {
            location: self.location,
            price: self.price,
            area: self.area,
            amenities: self.amenities,
            overall: normalizer::sanitize(overall),
        }
    }
}

/// One recommendation method's scoring rule
pub trait MethodScorer: Send + Sync {
    fn method(&self) -> RecommendationMethod;

    /// Score a candidate from features already extracted for it
    fn score_features(
        &self,
        candidate: &Room,
        features: &CandidateFeatures,
        ctx: &ScoringContext,
    ) -> (f64, SimilarityBreakdown);

    fn score(&self, target: &Room, candidate: &Room, ctx: &ScoringContext) -> (f64, SimilarityBreakdown) {
        let features = CandidateFeatures::extract(target, candidate, ctx);
        self.score_features(candidate, &features, ctx)
    }
}

/// Scored candidate ready for ranking
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    /// Position in the retrieved candidate list
    pub index: usize,
    pub room_id: RoomId,
    pub score: f64,
    /// Secondary key compared before distance; only POPULARITY sets it
    pub tie_breaker: f64,
    pub distance_km: f64,
    pub breakdown: SimilarityBreakdown,
}

/// Score one candidate under `method`
pub fn score_candidate(
    method: RecommendationMethod,
    target: &Room,
    candidate: &Room,
    index: usize,
    ctx: &ScoringContext,
) -> ScoredCandidate {
    let features = CandidateFeatures::extract(target, candidate, ctx);

    let (score, tie_breaker, breakdown) = match method {
        RecommendationMethod::ContentBased => {
            let (score, breakdown) = ContentBasedScorer.score_features(candidate, &features, ctx);
            (score, 0.0, breakdown)
        }
        RecommendationMethod::LocationBased => {
            let (score, breakdown) = LocationBasedScorer.score_features(candidate, &features, ctx);
            (score, 0.0, breakdown)
        }
        RecommendationMethod::Popularity => {
            let (score, breakdown) = PopularityScorer.score_features(candidate, &features, ctx);
            let (content, _) = ContentBasedScorer.score_features(candidate, &features, ctx);
            (score, content, breakdown)
        }
        RecommendationMethod::Collaborative => {
            let (score, breakdown) = CollaborativeScorer.score_features(candidate, &features, ctx);
            (score, 0.0, breakdown)
        }
        RecommendationMethod::Hybrid => {
            let (content, _) = ContentBasedScorer.score_features(candidate, &features, ctx);
            let (popularity, _) = PopularityScorer.score_features(candidate, &features, ctx);
            let (collaborative, _) = CollaborativeScorer.score_features(candidate, &features, ctx);
            let blended = ctx.hybrid.blend(content, popularity, collaborative);
            (blended, 0.0, features.breakdown(blended))
        }
    };

    ScoredCandidate {
        index,
        room_id: candidate.id,
        score: normalizer::sanitize(score),
        tie_breaker,
        distance_km: features.distance_km,
        breakdown,
    }
}

/// Shared flag telling in-flight scoring work to stop
///
/// Also counts the candidates scored under it, so a caller can tell how far
/// abandoned work got.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
    scored: Arc<AtomicUsize>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Candidates scored so far under this flag
    pub fn scored(&self) -> usize {
        self.scored.load(Ordering::Acquire)
    }

    fn record_scored(&self) {
        self.scored.fetch_add(1, Ordering::AcqRel);
    }

    /// Guard that raises the flag when dropped unless disarmed first
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop(Some(self.clone()))
    }
}

pub struct CancelOnDrop(Option<CancellationFlag>);

impl CancelOnDrop {
    /// Work finished; leave the flag as it is
    pub fn disarm(mut self) {
        self.0 = None;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(flag) = self.0.take() {
            flag.cancel();
        }
    }
}

fn score_range(
    method: RecommendationMethod,
    target: &Room,
    candidates: &[Room],
    range: Range<usize>,
    ctx: &ScoringContext,
    cancel: &CancellationFlag,
) -> Option<Vec<ScoredCandidate>> {
    let mut scored = Vec::with_capacity(range.len());
    for index in range {
        if cancel.is_cancelled() {
            return None;
        }
        scored.push(score_candidate(method, target, &candidates[index], index, ctx));
        cancel.record_scored();
    }
    Some(scored)
}

/// Score every candidate, in input order
///
/// Below `parallel_threshold` candidates scoring runs inline. Above it the
/// set is split into one chunk per core and each chunk runs on the blocking
/// pool. Chunks stop early once `cancel` is raised.
pub async fn score_candidates(
    method: RecommendationMethod,
    target: Arc<Room>,
    candidates: Arc<Vec<Room>>,
    ctx: Arc<ScoringContext>,
    parallel_threshold: usize,
    cancel: &CancellationFlag,
) -> Result<Vec<ScoredCandidate>, RecommendationError> {
    let total = candidates.len();

    if total < parallel_threshold.max(2) {
        return score_range(method, &target, &candidates, 0..total, &ctx, cancel)
            .ok_or(RecommendationError::Cancelled);
    }

    let workers = num_cpus::get().max(1);
    let chunk_size = total.div_ceil(workers).max(1);
    debug!(total, workers, chunk_size, "Scoring candidates on blocking pool");

    let handles: Vec<_> = (0..total)
        .step_by(chunk_size)
        .map(|start| {
            let end = (start + chunk_size).min(total);
            let target = Arc::clone(&target);
            let candidates = Arc::clone(&candidates);
            let ctx = Arc::clone(&ctx);
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                score_range(method, &target, &candidates, start..end, &ctx, &cancel)
            })
        })
        .collect();

    let mut scored = Vec::with_capacity(total);
    for result in futures::future::join_all(handles).await {
        match result {
            Ok(Some(chunk)) => scored.extend(chunk),
            Ok(None) => return Err(RecommendationError::Cancelled),
            Err(e) => {
                return Err(RecommendationError::Internal(format!(
                    "scoring worker failed: {}",
                    e
                )))
            }
        }
    }

    Ok(scored)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_features_for_identical_room() {
        let target = room(1, 0.0, 3_000_000.0, 25.0, &[1, 2]);
        let twin = room(2, 0.0, 3_000_000.0, 25.0, &[1, 2]);
        let ctx = context(&target);

        let features = CandidateFeatures::extract(&target, &twin, &ctx);
        assert_eq!(features.distance_km, 0.0);
        assert_eq!(features.location, 1.0);
        assert_eq!(features.price, 1.0);
        assert_eq!(features.area, 1.0);
        assert_eq!(features.amenities, 1.0);
    }

    #[test]
    fn test_only_popularity_sets_tie_breaker() {
        let target = room(1, 0.0, 3_000_000.0, 25.0, &[]);
        let candidate = room(2, 1.0, 3_000_000.0, 25.0, &[]);
        let ctx = context(&target);

        for method in RecommendationMethod::ALL {
            let scored = score_candidate(method, &target, &candidate, 0, &ctx);
            if method == RecommendationMethod::Popularity {
                assert!(scored.tie_breaker > 0.0);
            } else {
                assert_eq!(scored.tie_breaker, 0.0, "{}", method);
            }
            assert!((0.0..=1.0).contains(&scored.score));
        }
    }

    #[test]
    fn test_hybrid_blends_method_scores() {
        let target = room(1, 0.0, 3_000_000.0, 25.0, &[]);
        let candidate = room(2, 0.0, 3_000_000.0, 25.0, &[]);
        let ctx = context(&target)
            .with_popularity(HashMap::from([(2, 10)]))
            .with_co_occurrence(HashMap::from([(2, 0.4)]));

        let scored = score_candidate(RecommendationMethod::Hybrid, &target, &candidate, 0, &ctx);
        // content 1.0, popularity 1.0, collaborative 0.4
        let expected = 0.5 * 1.0 + 0.2 * 1.0 + 0.3 * 0.4;
        assert!((scored.score - expected).abs() < 1e-12);
        assert_eq!(scored.breakdown.overall, scored.score);
    }

    #[tokio::test]
    async fn test_parallel_matches_inline() {
        let target = Arc::new(room(1, 0.0, 3_000_000.0, 25.0, &[1, 2, 3]));
        let candidates: Vec<Room> = (2..200)
            .map(|id| {
                room(
                    id,
                    (id % 17) as f64 * 0.4,
                    2_500_000.0 + (id * 7_919 % 1_000_000) as f64,
                    18.0 + (id % 11) as f64,
                    &[1, (id % 4) + 1],
                )
            })
            .collect();
        let candidates = Arc::new(candidates);
        let ctx = Arc::new(context(&target));
        let cancel = CancellationFlag::new();

        let inline = score_candidates(
            RecommendationMethod::ContentBased,
            target.clone(),
            candidates.clone(),
            ctx.clone(),
            usize::MAX,
            &cancel,
        )
        .await
        .unwrap();
        let parallel = score_candidates(
            RecommendationMethod::ContentBased,
            target,
            candidates,
            ctx,
            8,
            &cancel,
        )
        .await
        .unwrap();

        assert_eq!(inline.len(), 198);
        assert_eq!(inline, parallel);
        assert_eq!(cancel.scored(), 2 * 198);
    }

    #[tokio::test]
    async fn test_cancelled_scoring_stops() {
        let target = Arc::new(room(1, 0.0, 3_000_000.0, 25.0, &[]));
        let candidates = Arc::new(vec![room(2, 1.0, 3_000_000.0, 25.0, &[])]);
        let ctx = Arc::new(context(&target));
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let result = score_candidates(
            RecommendationMethod::ContentBased,
            target,
            candidates,
            ctx,
            64,
            &cancel,
        )
        .await;
        assert!(matches!(result, Err(RecommendationError::Cancelled)));
        assert_eq!(cancel.scored(), 0);
    }

    #[test]
    fn test_guard_raises_flag_on_drop() {
        let flag = CancellationFlag::new();
        {
            let _guard = flag.cancel_on_drop();
            assert!(!flag.is_cancelled());
        }
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_disarmed_guard_leaves_flag_down() {
        let flag = CancellationFlag::new();
        flag.cancel_on_drop().disarm();
        assert!(!flag.is_cancelled());
    }
}
