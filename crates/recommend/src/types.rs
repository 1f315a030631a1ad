//! Domain types shared across the recommendation engine
//!
//! Room, rental and amenity data is owned by the listing store and is only
//! ever read here. Everything else in this module is request-scoped.

use crate::weights::{HybridWeights, SimilarityWeights};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub type RoomId = i64;
pub type AmenityId = i64;

/// Recommendation strategy requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecommendationMethod {
    #[default]
    ContentBased,
    Popularity,
    LocationBased,
    Collaborative,
    Hybrid,
}

impl RecommendationMethod {
    pub const ALL: [RecommendationMethod; 5] = [
        RecommendationMethod::ContentBased,
        RecommendationMethod::Popularity,
        RecommendationMethod::LocationBased,
        RecommendationMethod::Collaborative,
        RecommendationMethod::Hybrid,
    ];

    /// Wire tag
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationMethod::ContentBased => "CONTENT_BASED",
            RecommendationMethod::Popularity => "POPULARITY",
            RecommendationMethod::LocationBased => "LOCATION_BASED",
            RecommendationMethod::Collaborative => "COLLABORATIVE",
            RecommendationMethod::Hybrid => "HYBRID",
        }
    }

    /// Whether candidate retrieval always applies the geo hard filter
    pub fn is_geo_bounded(&self) -> bool {
        matches!(
            self,
            RecommendationMethod::ContentBased | RecommendationMethod::LocationBased
        )
    }

    pub fn needs_popularity(&self) -> bool {
        matches!(
            self,
            RecommendationMethod::Popularity | RecommendationMethod::Hybrid
        )
    }

    pub fn needs_co_occurrence(&self) -> bool {
        matches!(
            self,
            RecommendationMethod::Collaborative | RecommendationMethod::Hybrid
        )
    }
}

impl fmt::Display for RecommendationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a method tag is not one of the five known tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown recommendation method '{}' (expected one of CONTENT_BASED, POPULARITY, LOCATION_BASED, COLLABORATIVE, HYBRID)",
            self.0
        )
    }
}

impl std::error::Error for UnknownMethod {}

impl FromStr for RecommendationMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        RecommendationMethod::ALL
            .into_iter()
            .find(|method| method.as_str() == normalized)
            .ok_or_else(|| UnknownMethod(s.to_string()))
    }
}

impl Serialize for RecommendationMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RecommendationMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Amenity reference data, compared by id only
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amenity {
    pub id: AmenityId,
    pub name: String,
}

/// Rental listing that owns one or more rooms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: i64,
    pub title: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Room as read from the listing store, with its rental and amenities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub title: String,
    pub price: f64,
    pub area: f64,
    pub is_available: bool,
    pub rental: Rental,
    #[serde(default)]
    pub amenities: Vec<Amenity>,
}

impl Room {
    pub fn amenity_ids(&self) -> HashSet<AmenityId> {
        self.amenities.iter().map(|a| a.id).collect()
    }

    pub fn latitude(&self) -> f64 {
        self.rental.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.rental.longitude
    }
}

/// Room fields echoed back in responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub title: String,
    pub price: f64,
    pub area: f64,
    pub is_available: bool,
    pub amenities: Vec<Amenity>,
}

impl From<&Room> for RoomSnapshot {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id,
            title: room.title.clone(),
            price: room.price,
            area: room.area,
            is_available: room.is_available,
            amenities: room.amenities.clone(),
        }
    }
}

/// Per-dimension similarity scores, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SimilarityBreakdown {
    pub location: f64,
    pub price: f64,
    pub area: f64,
    pub amenities: f64,
    /// Weighted content score or the method-specific aggregate
    pub overall: f64,
}

/// Presentational explanation attached to each result
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationExplanation {
    pub reasons: Vec<String>,
    /// Kilometres between target and candidate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    /// Candidate price minus target price
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_difference: Option<f64>,
    /// Candidate area minus target area
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area_difference: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub common_amenities: Vec<String>,
}

/// One ranked result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedRoom {
    #[serde(flatten)]
    pub room: RoomSnapshot,
    pub similarity_score: f64,
    pub method: RecommendationMethod,
    pub explanation: RecommendationExplanation,
    pub similarity_breakdown: SimilarityBreakdown,
    /// 1-based position in the returned list
    pub rank: usize,
    pub rental: Rental,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationMetadata {
    pub total_candidates: usize,
    pub method: RecommendationMethod,
    /// Wall-clock time spent producing the response, in milliseconds
    pub execution_time: u64,
    pub weights: SimilarityWeights,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid_weights: Option<HybridWeights>,
    pub target_room: RoomSnapshot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationsResponse {
    pub data: Vec<RecommendedRoom>,
    pub metadata: RecommendationMetadata,
}

/// Input to `RecommendationEngine::get_recommendations`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub room_id: Option<RoomId>,
    /// Used as the target when `room_id` is absent
    #[serde(default)]
    pub last_viewed_room_id: Option<RoomId>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub method: Option<RecommendationMethod>,
    #[serde(default)]
    pub max_distance_km: Option<f64>,
    #[serde(default)]
    pub price_variance: Option<f64>,
    #[serde(default)]
    pub area_variance: Option<f64>,
    #[serde(default)]
    pub weights: Option<SimilarityWeights>,
    #[serde(default)]
    pub hybrid_weights: Option<HybridWeights>,
}

impl RecommendationRequest {
    pub fn for_room(room_id: RoomId) -> Self {
        Self {
            room_id: Some(room_id),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: RecommendationMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_max_distance_km(mut self, max_distance_km: f64) -> Self {
        self.max_distance_km = Some(max_distance_km);
        self
    }
}

/// Click on a recommended room, appended to the feedback log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub source_room_id: RoomId,
    pub target_room_id: RoomId,
    pub method: RecommendationMethod,
    pub rank: u32,
    pub similarity_score: f64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Generic response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn ack(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
