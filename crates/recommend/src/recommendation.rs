//! Recommendation orchestrator
//!
//! Drives one request through VALIDATING, RETRIEVING, SCORING, AGGREGATING
//! and EXPLAINING to DONE. Any failure moves the request to ERRORED and is
//! returned as a typed error; there are no retries and no partial results.

use crate::aggregator::HybridAggregator;
use crate::cache::CandidateCache;
use crate::config::RecommendConfig;
use crate::error::RecommendationError;
use crate::explanation::ExplanationGenerator;
use crate::feedback::FeedbackRecorder;
use crate::retriever::CandidateRetriever;
use crate::scoring::{score_candidates, CancellationFlag, ScoringContext};
use crate::store::{FeedbackStore, RoomStore};
use crate::types::{
    ClickEvent, RecommendationMetadata, RecommendationMethod, RecommendationRequest,
    RecommendationsResponse, RecommendedRoom, Room, RoomId, RoomSnapshot,
};
use crate::weights::SimilarityWeights;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum RecommendationStage {
    Validating = 0,
    Retrieving = 1,
    Scoring = 2,
    Aggregating = 3,
    Explaining = 4,
    Done = 5,
    Errored = 6,
}

impl RecommendationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStage::Validating => "VALIDATING",
            RecommendationStage::Retrieving => "RETRIEVING",
            RecommendationStage::Scoring => "SCORING",
            RecommendationStage::Aggregating => "AGGREGATING",
            RecommendationStage::Explaining => "EXPLAINING",
            RecommendationStage::Done => "DONE",
            RecommendationStage::Errored => "ERRORED",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => RecommendationStage::Validating,
            1 => RecommendationStage::Retrieving,
            2 => RecommendationStage::Scoring,
            3 => RecommendationStage::Aggregating,
            4 => RecommendationStage::Explaining,
            5 => RecommendationStage::Done,
            _ => RecommendationStage::Errored,
        }
    }
}

impl fmt::Display for RecommendationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current stage of one request, readable after its future is dropped
struct StageTracker {
    stage: AtomicU8,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stage: AtomicU8::new(RecommendationStage::Validating as u8),
        }
    }

    fn advance(&self, stage: RecommendationStage) {
        let previous = self.stage.swap(stage as u8, Ordering::AcqRel);
        debug!(
            from = %RecommendationStage::from_u8(previous),
            to = %stage,
            "Stage transition"
        );
    }

    #[cfg(test)]
    fn current(&self) -> RecommendationStage {
        RecommendationStage::from_u8(self.stage.load(Ordering::Acquire))
    }

    /// Move to ERRORED, returning the stage that failed
    fn fail(&self) -> RecommendationStage {
        RecommendationStage::from_u8(
            self.stage
                .swap(RecommendationStage::Errored as u8, Ordering::AcqRel),
        )
    }
}

/// Request parameters after validation and defaulting
#[derive(Debug, Clone)]
struct ValidatedRequest {
    target_id: RoomId,
    method: RecommendationMethod,
    limit: usize,
    /// Hard retrieval filter, if any
    geo_filter_km: Option<f64>,
    /// Radius at which location similarity decays to 0
    decay_km: f64,
    price_variance: f64,
    area_variance: f64,
    weights: SimilarityWeights,
    hybrid: HybridAggregator,
}

/// Public entry point of the recommendation engine
pub struct RecommendationEngine {
    config: RecommendConfig,
    rooms: Arc<dyn RoomStore>,
    retriever: CandidateRetriever,
    feedback: FeedbackRecorder,
    explainer: ExplanationGenerator,
}

impl RecommendationEngine {
    pub fn new(
        config: RecommendConfig,
        rooms: Arc<dyn RoomStore>,
        feedback: Arc<dyn FeedbackStore>,
    ) -> Result<Self, RecommendationError> {
        config.validate().map_err(|e| {
            RecommendationError::Validation(format!("invalid engine configuration: {}", e))
        })?;

        let mut retriever = CandidateRetriever::new(
            Arc::clone(&rooms),
            config.engine.candidate_multiplier,
            config.engine.max_candidates,
            config.engine.max_scan,
        );
        if config.cache.enabled {
            retriever = retriever.with_cache(Arc::new(CandidateCache::new(
                config.cache_ttl(),
                config.cache.max_entries,
            )));
        }

        Ok(Self {
            explainer: ExplanationGenerator::new(config.engine.materiality_threshold),
            feedback: FeedbackRecorder::new(feedback),
            retriever,
            rooms,
            config,
        })
    }

    pub fn config(&self) -> &RecommendConfig {
        &self.config
    }

    /// Produce ranked, explained recommendations for a target room
    ///
    /// A target with no eligible candidates yields an empty `data` list. The
    /// whole request is bounded by the configured timeout; on expiry any
    /// in-flight scoring work is told to stop.
    pub async fn get_recommendations(
        &self,
        request: RecommendationRequest,
    ) -> Result<RecommendationsResponse, RecommendationError> {
        self.get_recommendations_with_cancel(request, CancellationFlag::new())
            .await
    }

    /// Like [`get_recommendations`](Self::get_recommendations), with a
    /// caller-owned flag
    ///
    /// Raising `cancel` stops scoring early with `Cancelled`. The engine
    /// raises it too when the request times out or its future is dropped
    /// before scoring finishes. Use one flag per request.
    #[instrument(skip(self, request, cancel), fields(request_id = %Uuid::new_v4(), room_id = ?request.room_id, method = ?request.method))]
    pub async fn get_recommendations_with_cancel(
        &self,
        request: RecommendationRequest,
        cancel: CancellationFlag,
    ) -> Result<RecommendationsResponse, RecommendationError> {
        let started = Instant::now();
        let tracker = StageTracker::new();

        let outcome = tokio::time::timeout(
            self.config.request_timeout(),
            self.run(&request, &tracker, &cancel, started),
        )
        .await;

        match outcome {
            Ok(Ok(response)) => {
                info!(
                    results = response.data.len(),
                    total_candidates = response.metadata.total_candidates,
                    execution_time_ms = response.metadata.execution_time,
                    "Recommendations generated"
                );
                Ok(response)
            }
            Ok(Err(err)) => {
                let stage = tracker.fail();
                match &err {
                    RecommendationError::Validation(_) | RecommendationError::TargetNotFound(_) => {
                        info!(stage = %stage, error = %err, "Recommendation request rejected")
                    }
                    RecommendationError::UpstreamStore { component, .. } => {
                        error!(stage = %stage, component = %component, error = %err, "Upstream store failed")
                    }
                    _ => warn!(stage = %stage, error = %err, "Recommendation failed"),
                }
                Err(err)
            }
            Err(_) => {
                let stage = tracker.fail();
                warn!(
                    stage = %stage,
                    timeout_ms = self.config.engine.request_timeout_ms,
                    scored = cancel.scored(),
                    "Recommendation timed out"
                );
                Err(RecommendationError::Timeout { stage })
            }
        }
    }

    /// Validate a click and record it in the background
    pub fn track_click(&self, event: ClickEvent) -> Result<JoinHandle<()>, RecommendationError> {
        self.feedback.record_click(event)
    }

    async fn run(
        &self,
        request: &RecommendationRequest,
        tracker: &StageTracker,
        cancel: &CancellationFlag,
        started: Instant,
    ) -> Result<RecommendationsResponse, RecommendationError> {
        let params = self.validate(request)?;

        let target = self
            .rooms
            .find_room(params.target_id)
            .await
            .map_err(|e| {
                RecommendationError::upstream("room_store", RecommendationStage::Validating, e)
            })?
            .filter(|room| room.is_available)
            .ok_or(RecommendationError::TargetNotFound(params.target_id))?;

        tracker.advance(RecommendationStage::Retrieving);
        let candidates = match self
            .retriever
            .retrieve(&target, params.method, params.limit, params.geo_filter_km)
            .await
        {
            Ok(candidates) => candidates,
            Err(RecommendationError::NoCandidates(room_id)) => {
                debug!(room_id, "No eligible candidates");
                tracker.advance(RecommendationStage::Done);
                return Ok(self.response(&params, &target, Vec::new(), 0, started));
            }
            Err(e) => return Err(e),
        };

        let ids: Vec<RoomId> = candidates.iter().map(|room| room.id).collect();
        let (popularity, co_occurrence) = self.load_aggregates(&params, target.id, &ids).await?;

        tracker.advance(RecommendationStage::Scoring);
        let ctx = ScoringContext::new(
            &target,
            params.weights,
            params.hybrid,
            params.price_variance,
            params.area_variance,
            params.decay_km,
            self.config.engine.collaborative_damping,
        )
        .with_popularity(popularity)
        .with_co_occurrence(co_occurrence);

        let target = Arc::new(target);
        let cancel_guard = cancel.cancel_on_drop();
        let scored = score_candidates(
            params.method,
            Arc::clone(&target),
            Arc::clone(&candidates),
            Arc::new(ctx),
            self.config.engine.parallel_threshold,
            cancel,
        )
        .await?;
        cancel_guard.disarm();

        tracker.advance(RecommendationStage::Aggregating);
        let ranked = params.hybrid.rank(scored, params.limit);

        tracker.advance(RecommendationStage::Explaining);
        let data = ranked
            .into_iter()
            .map(|ranked| {
                let scored = ranked.candidate;
                let room = &candidates[scored.index];
                RecommendedRoom {
                    room: RoomSnapshot::from(room),
                    similarity_score: scored.score,
                    method: params.method,
                    explanation: self.explainer.explain(
                        params.method,
                        &target,
                        room,
                        &scored.breakdown,
                        scored.distance_km,
                    ),
                    similarity_breakdown: scored.breakdown,
                    rank: ranked.rank,
                    rental: room.rental.clone(),
                }
            })
            .collect();

        tracker.advance(RecommendationStage::Done);
        Ok(self.response(&params, &target, data, candidates.len(), started))
    }

    fn validate(
        &self,
        request: &RecommendationRequest,
    ) -> Result<ValidatedRequest, RecommendationError> {
        let engine = &self.config.engine;

        let target_id = resolve_target(request)?;
        let method = request.method.unwrap_or_default();

        let limit = request.limit.unwrap_or(engine.default_limit);
        if limit == 0 || limit > engine.max_limit {
            return Err(RecommendationError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                engine.max_limit, limit
            )));
        }

        let max_distance_km =
            bounded_positive("maxDistanceKm", request.max_distance_km, engine.max_distance_limit_km)?;
        let price_variance =
            bounded_positive("priceVariance", request.price_variance, engine.max_variance)?;
        let area_variance =
            bounded_positive("areaVariance", request.area_variance, engine.max_variance)?;

        let weights = request.weights.unwrap_or(self.config.weights);
        weights.validate_within(engine.weight_epsilon)?;

        let hybrid_weights = request.hybrid_weights.unwrap_or(self.config.hybrid_weights);
        hybrid_weights.validate_within(engine.weight_epsilon)?;

        let decay_km = max_distance_km.unwrap_or(engine.default_max_distance_km);
        let geo_filter_km = if method.is_geo_bounded() {
            Some(decay_km)
        } else {
            max_distance_km
        };

        Ok(ValidatedRequest {
            target_id,
            method,
            limit,
            geo_filter_km,
            decay_km,
            price_variance: price_variance.unwrap_or(engine.default_price_variance),
            area_variance: area_variance.unwrap_or(engine.default_area_variance),
            weights,
            hybrid: HybridAggregator::prevalidated(hybrid_weights),
        })
    }

    async fn load_aggregates(
        &self,
        params: &ValidatedRequest,
        target_id: RoomId,
        ids: &[RoomId],
    ) -> Result<(HashMap<RoomId, u64>, HashMap<RoomId, f64>), RecommendationError> {
        let popularity = async {
            if params.method.needs_popularity() {
                self.feedback.popularity(ids).await
            } else {
                Ok(HashMap::new())
            }
        };
        let co_occurrence = async {
            if params.method.needs_co_occurrence() {
                self.feedback.co_occurrence(target_id, ids).await
            } else {
                Ok(HashMap::new())
            }
        };

        let (popularity, co_occurrence) = tokio::join!(popularity, co_occurrence);
        let upstream = |e| {
            RecommendationError::upstream("feedback_store", RecommendationStage::Retrieving, e)
        };

        Ok((popularity.map_err(upstream)?, co_occurrence.map_err(upstream)?))
    }

    fn response(
        &self,
        params: &ValidatedRequest,
        target: &Room,
        data: Vec<RecommendedRoom>,
        total_candidates: usize,
        started: Instant,
    ) -> RecommendationsResponse {
        RecommendationsResponse {
            data,
            metadata: RecommendationMetadata {
                total_candidates,
                method: params.method,
                execution_time: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                weights: params.weights,
                hybrid_weights: (params.method == RecommendationMethod::Hybrid)
                    .then(|| *params.hybrid.weights()),
                target_room: RoomSnapshot::from(target),
            },
        }
    }
}

/// Explicit room id first, then the last viewed room; no implicit default
fn resolve_target(request: &RecommendationRequest) -> Result<RoomId, RecommendationError> {
    let target_id = request
        .room_id
        .or(request.last_viewed_room_id)
        .ok_or_else(|| {
            RecommendationError::Validation(
                "roomId or lastViewedRoomId is required".to_string(),
            )
        })?;

    if target_id <= 0 {
        return Err(RecommendationError::Validation(format!(
            "room id must be positive, got {}",
            target_id
        )));
    }

    Ok(target_id)
}

fn bounded_positive(
    name: &str,
    value: Option<f64>,
    max: f64,
) -> Result<Option<f64>, RecommendationError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 || v > max => {
            Err(RecommendationError::Validation(format!(
                "{} must be greater than 0 and at most {}, got {}",
                name, max, v
            )))
        }
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_tracker_reports_failing_stage() {
        let tracker = StageTracker::new();
        assert_eq!(tracker.current(), RecommendationStage::Validating);

        tracker.advance(RecommendationStage::Retrieving);
        tracker.advance(RecommendationStage::Scoring);
        assert_eq!(tracker.fail(), RecommendationStage::Scoring);
        assert_eq!(tracker.current(), RecommendationStage::Errored);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(RecommendationStage::Aggregating.to_string(), "AGGREGATING");
        assert_eq!(
            serde_json::to_string(&RecommendationStage::Done).unwrap(),
            "\"DONE\""
        );
    }

    #[test]
    fn test_target_precedence() {
        let explicit = RecommendationRequest {
            room_id: Some(3),
            last_viewed_room_id: Some(9),
            ..Default::default()
        };
        assert_eq!(resolve_target(&explicit).unwrap(), 3);

        let fallback = RecommendationRequest {
            last_viewed_room_id: Some(9),
            ..Default::default()
        };
        assert_eq!(resolve_target(&fallback).unwrap(), 9);

        assert!(resolve_target(&RecommendationRequest::default()).is_err());
        assert!(resolve_target(&RecommendationRequest::for_room(0)).is_err());
    }

    #[test]
    fn test_bounded_positive() {
        assert_eq!(bounded_positive("x", None, 5.0).unwrap(), None);
        assert_eq!(bounded_positive("x", Some(2.0), 5.0).unwrap(), Some(2.0));
        assert!(bounded_positive("x", Some(0.0), 5.0).is_err());
        assert!(bounded_positive("x", Some(5.5), 5.0).is_err());
        assert!(bounded_positive("x", Some(f64::NAN), 5.0).is_err());
    }
}
