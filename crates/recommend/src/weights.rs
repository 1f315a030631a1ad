//! Validated weight vectors
//!
//! Both vectors must be finite, non-negative and sum to 1.0 within a small
//! tolerance. Vectors that fail are rejected, never renormalised.

use crate::error::RecommendationError;
use serde::{Deserialize, Serialize};

/// Default tolerance when checking that a weight vector sums to 1.0
pub const WEIGHT_EPSILON: f64 = 0.0001;

/// Dimension weights for content-based scoring
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub location: f64,
    pub price: f64,
    pub area: f64,
    pub amenities: f64,
}

impl SimilarityWeights {
    /// Create weights, rejecting vectors that do not sum to 1.0
    pub fn new(
        location: f64,
        price: f64,
        area: f64,
        amenities: f64,
    ) -> Result<Self, RecommendationError> {
        let weights = Self {
            location,
            price,
            area,
            amenities,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), RecommendationError> {
        self.validate_within(WEIGHT_EPSILON)
    }

    pub fn validate_within(&self, epsilon: f64) -> Result<(), RecommendationError> {
        validate_vector(
            "weights",
            &[
                ("location", self.location),
                ("price", self.price),
                ("area", self.area),
                ("amenities", self.amenities),
            ],
            epsilon,
        )
    }

    pub fn total_weight(&self) -> f64 {
        self.location + self.price + self.area + self.amenities
    }

    /// Weighted sum of per-dimension similarities
    pub fn combine(&self, location: f64, price: f64, area: f64, amenities: f64) -> f64 {
        self.location * location
            + self.price * price
            + self.area * area
            + self.amenities * amenities
    }
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            location: 0.3,
            price: 0.3,
            area: 0.2,
            amenities: 0.2,
        }
    }
}

/// Second-level weights blending method scores under HYBRID
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridWeights {
    #[serde(alias = "content_based", alias = "contentbased")]
    pub content_based: f64,
    pub popularity: f64,
    pub collaborative: f64,
}

impl HybridWeights {
    pub fn new(
        content_based: f64,
        popularity: f64,
        collaborative: f64,
    ) -> Result<Self, RecommendationError> {
        let weights = Self {
            content_based,
            popularity,
            collaborative,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), RecommendationError> {
        self.validate_within(WEIGHT_EPSILON)
    }

    pub fn validate_within(&self, epsilon: f64) -> Result<(), RecommendationError> {
        validate_vector(
            "hybridWeights",
            &[
                ("contentBased", self.content_based),
                ("popularity", self.popularity),
                ("collaborative", self.collaborative),
            ],
            epsilon,
        )
    }

    pub fn total_weight(&self) -> f64 {
        self.content_based + self.popularity + self.collaborative
    }
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            content_based: 0.5,
            popularity: 0.2,
            collaborative: 0.3,
        }
    }
}

fn validate_vector(
    name: &str,
    components: &[(&str, f64)],
    epsilon: f64,
) -> Result<(), RecommendationError> {
    if let Some((field, value)) = components.iter().find(|(_, v)| !v.is_finite()) {
        return Err(RecommendationError::Validation(format!(
            "{}.{} must be a finite number, got {}",
            name, field, value
        )));
    }

    if let Some((field, value)) = components.iter().find(|(_, v)| *v < 0.0) {
        return Err(RecommendationError::Validation(format!(
            "All {} must be non-negative ({} = {})",
            name, field, value
        )));
    }

    let sum: f64 = components.iter().map(|(_, v)| v).sum();
    if (sum - 1.0).abs() > epsilon {
        return Err(RecommendationError::Validation(format!(
            "{} must sum to 1.0, got {:.4}",
            name, sum
        )));
    }

    Ok(())
}
