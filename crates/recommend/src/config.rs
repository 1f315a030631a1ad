use crate::weights::{HybridWeights, SimilarityWeights};
use roomfinder_core::CoreError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Recommendation engine configuration
///
/// Loaded from an optional `config/recommend.{toml,yaml,json}` file layered
/// under `RECOMMEND__*` environment variables, e.g.
/// `RECOMMEND__ENGINE__MAX_LIMIT=30` or `RECOMMEND__WEIGHTS__PRICE=0.4`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecommendConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    /// Default dimension weights for content-based scoring
    #[serde(default)]
    pub weights: SimilarityWeights,

    /// Default method weights for HYBRID
    #[serde(default)]
    pub hybrid_weights: HybridWeights,

    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Result count when the request omits `limit`
    pub default_limit: usize,

    /// Largest `limit` a caller may request
    pub max_limit: usize,

    /// Candidate cap = limit * multiplier, bounded by `max_candidates`
    pub candidate_multiplier: usize,

    pub max_candidates: usize,

    /// Rows read from the room store before the exact distance filter
    pub max_scan: usize,

    pub default_price_variance: f64,

    pub default_area_variance: f64,

    /// Decay radius, and hard filter for geo-bounded methods
    pub default_max_distance_km: f64,

    /// Largest `maxDistanceKm` a caller may request
    pub max_distance_limit_km: f64,

    /// Largest price/area variance fraction a caller may request
    pub max_variance: f64,

    /// Similarity above which a dimension is called out in the explanation
    pub materiality_threshold: f64,

    /// Scale applied to content scores when co-occurrence data is missing
    pub collaborative_damping: f64,

    /// Candidate count at which scoring moves onto the blocking pool
    pub parallel_threshold: usize,

    pub request_timeout_ms: u64,

    pub weight_epsilon: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_limit: 4,
            max_limit: 20,
            candidate_multiplier: 5,
            max_candidates: 100,
            max_scan: 1000,
            default_price_variance: 0.3,
            default_area_variance: 0.5,
            default_max_distance_km: 10.0,
            max_distance_limit_km: 100.0,
            max_variance: 5.0,
            materiality_threshold: 0.5,
            collaborative_damping: 0.5,
            parallel_threshold: 64,
            request_timeout_ms: 2000,
            weight_epsilon: 0.0001,
        }
    }
}

/// Candidate cache configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Seconds an entry stays valid
    pub ttl_secs: u64,

    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 5,
            max_entries: 1024,
        }
    }
}

impl RecommendConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, CoreError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config/recommend").required(false))
            .add_source(
                config::Environment::with_prefix("RECOMMEND")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| CoreError::config(e.to_string(), "config/recommend"))?;

        Self::from_settings(settings)
    }

    fn from_settings(settings: config::Config) -> Result<Self, CoreError> {
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| CoreError::config(e.to_string(), "config/recommend"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let engine = &self.engine;

        if engine.default_limit == 0 || engine.max_limit == 0 {
            return Err(CoreError::config(
                "default_limit and max_limit must be greater than 0",
                "engine.default_limit",
            ));
        }

        if engine.default_limit > engine.max_limit {
            return Err(CoreError::config(
                format!(
                    "default_limit ({}) cannot exceed max_limit ({})",
                    engine.default_limit, engine.max_limit
                ),
                "engine.default_limit",
            ));
        }

        if engine.candidate_multiplier == 0 || engine.max_candidates < engine.max_limit {
            return Err(CoreError::config(
                "candidate cap must be at least max_limit",
                "engine.max_candidates",
            ));
        }

        if engine.max_scan < engine.max_candidates {
            return Err(CoreError::config(
                format!(
                    "max_scan ({}) cannot be below max_candidates ({})",
                    engine.max_scan, engine.max_candidates
                ),
                "engine.max_scan",
            ));
        }

        let positive = [
            ("engine.default_price_variance", engine.default_price_variance),
            ("engine.default_area_variance", engine.default_area_variance),
            ("engine.default_max_distance_km", engine.default_max_distance_km),
            ("engine.max_distance_limit_km", engine.max_distance_limit_km),
            ("engine.max_variance", engine.max_variance),
            ("engine.weight_epsilon", engine.weight_epsilon),
        ];
        if let Some((key, value)) = positive.iter().find(|(_, v)| !(v.is_finite() && *v > 0.0)) {
            return Err(CoreError::config(
                format!("{} must be a positive number, got {}", key, value),
                *key,
            ));
        }

        if engine.default_max_distance_km > engine.max_distance_limit_km {
            return Err(CoreError::config(
                "default_max_distance_km cannot exceed max_distance_limit_km",
                "engine.default_max_distance_km",
            ));
        }

        if !(0.0..=1.0).contains(&engine.materiality_threshold) {
            return Err(CoreError::config(
                "materiality_threshold must be within [0, 1]",
                "engine.materiality_threshold",
            ));
        }

        if !(0.0..=1.0).contains(&engine.collaborative_damping) {
            return Err(CoreError::config(
                "collaborative_damping must be within [0, 1]",
                "engine.collaborative_damping",
            ));
        }

        if engine.request_timeout_ms == 0 {
            return Err(CoreError::config(
                "request_timeout_ms must be greater than 0",
                "engine.request_timeout_ms",
            ));
        }

        self.weights
            .validate_within(engine.weight_epsilon)
            .map_err(|e| CoreError::config(e.to_string(), "weights"))?;
        self.hybrid_weights
            .validate_within(engine.weight_epsilon)
            .map_err(|e| CoreError::config(e.to_string(), "hybrid_weights"))?;

        if self.cache.enabled && (self.cache.ttl_secs == 0 || self.cache.max_entries == 0) {
            return Err(CoreError::config(
                "an enabled cache needs ttl_secs and max_entries above 0",
                "cache",
            ));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.engine.request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }
}
