//! Collaborator store interfaces
//!
//! The engine reads listing data from a [`RoomStore`] and popularity /
//! co-occurrence aggregates from a [`FeedbackStore`]. It never writes listing
//! data; the only write is appending click events.

mod memory;
mod postgres;

pub use memory::{InMemoryFeedbackStore, InMemoryRoomStore};
pub use postgres::{decimal_to_f64, PostgresFeedbackStore, PostgresRoomStore};

use crate::error::StoreError;
use crate::geo::BoundingBox;
use crate::types::{ClickEvent, Room, RoomId};
use async_trait::async_trait;
use std::collections::HashMap;

/// Filter passed to [`RoomStore::find_candidates`]
///
/// Results are ordered nearest-first from `origin` and then by id, so a
/// truncated scan keeps the rooms most likely to survive the distance filter.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFilter {
    pub exclude_room_id: RoomId,
    pub available_only: bool,
    pub bounding_box: Option<BoundingBox>,
    /// (latitude, longitude) used for ordering
    pub origin: (f64, f64),
    pub limit: usize,
}

/// Read-only access to rooms and their rentals
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn find_room(&self, id: RoomId) -> Result<Option<Room>, StoreError>;

    async fn find_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Room>, StoreError>;
}

/// Pre-aggregated feedback counters plus the append-only click log
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Aggregate click count for a room, 0 when unknown
    async fn get_popularity(&self, room_id: RoomId) -> Result<u64, StoreError>;

    /// Co-occurrence strength for an unordered pair, 0 when unknown
    async fn get_co_occurrence(&self, room_a: RoomId, room_b: RoomId)
        -> Result<f64, StoreError>;

    async fn append_click_event(&self, event: &ClickEvent) -> Result<(), StoreError>;

    /// Popularity for many rooms; rooms without counters are omitted
    async fn get_popularity_batch(
        &self,
        room_ids: &[RoomId],
    ) -> Result<HashMap<RoomId, u64>, StoreError> {
        let counts = futures::future::try_join_all(room_ids.iter().map(|&id| async move {
            self.get_popularity(id).await.map(|count| (id, count))
        }))
        .await?;

        Ok(counts.into_iter().filter(|(_, count)| *count > 0).collect())
    }

    /// Co-occurrence between `source` and each candidate; unknown pairs are omitted
    async fn get_co_occurrence_batch(
        &self,
        source: RoomId,
        room_ids: &[RoomId],
    ) -> Result<HashMap<RoomId, f64>, StoreError> {
        let strengths = futures::future::try_join_all(room_ids.iter().map(|&id| async move {
            self.get_co_occurrence(source, id)
                .await
                .map(|strength| (id, strength))
        }))
        .await?;

        Ok(strengths
            .into_iter()
            .filter(|(_, strength)| *strength != 0.0)
            .collect())
    }
}
