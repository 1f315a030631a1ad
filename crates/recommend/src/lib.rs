//! Room recommendation engine
//!
//! Given a target room, retrieves nearby available candidates, scores them
//! along location, price, area, amenity, popularity and co-occurrence
//! signals, ranks them under the selected method and explains each result.
//!
//! Listing data and feedback aggregates live in external stores reached
//! through [`RoomStore`] and [`FeedbackStore`].

pub mod aggregator;
pub mod cache;
pub mod config;
pub mod error;
pub mod explanation;
pub mod feedback;
pub mod geo;
pub mod normalizer;
pub mod recommendation;
pub mod retriever;
pub mod scoring;
pub mod server;
pub mod store;
pub mod types;
pub mod weights;

// Re-export key types
pub use aggregator::{HybridAggregator, RankedCandidate};
pub use cache::{CandidateCache, CandidateCacheKey};
pub use config::{CacheConfig, EngineConfig, RecommendConfig};
pub use error::{RecommendationError, Result, StoreError};
pub use explanation::ExplanationGenerator;
pub use feedback::FeedbackRecorder;
pub use geo::{distance_km, BoundingBox};
pub use recommendation::{RecommendationEngine, RecommendationStage};
pub use retriever::CandidateRetriever;
pub use scoring::{
    CancellationFlag, CollaborativeScorer, ContentBasedScorer, LocationBasedScorer, MethodScorer,
    PopularityScorer, ScoredCandidate, ScoringContext,
};
pub use store::{
    CandidateFilter, FeedbackStore, InMemoryFeedbackStore, InMemoryRoomStore,
    PostgresFeedbackStore, PostgresRoomStore, RoomStore,
};
pub use types::*;
pub use weights::{HybridWeights, SimilarityWeights};
