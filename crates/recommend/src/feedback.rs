//! Click-through feedback
//!
//! Recording is best-effort: events are validated synchronously and then
//! appended on a background task. Append failures are logged and dropped.

use crate::error::{RecommendationError, StoreError};
use crate::store::FeedbackStore;
use crate::types::{ClickEvent, RoomId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

#[derive(Clone)]
pub struct FeedbackRecorder {
    store: Arc<dyn FeedbackStore>,
}

impl FeedbackRecorder {
    pub fn new(store: Arc<dyn FeedbackStore>) -> Self {
        Self { store }
    }

    /// Validate a click event and append it in the background
    ///
    /// Only a malformed event is reported back. The returned handle resolves
    /// once the append attempt has finished; callers may drop it.
    #[instrument(skip(self, event), fields(source = event.source_room_id, target = event.target_room_id, method = %event.method))]
    pub fn record_click(&self, event: ClickEvent) -> Result<JoinHandle<()>, RecommendationError> {
        validate_click(&event)?;

        let store = Arc::clone(&self.store);
        Ok(tokio::spawn(async move {
            match store.append_click_event(&event).await {
                Ok(()) => debug!(
                    source = event.source_room_id,
                    target = event.target_room_id,
                    rank = event.rank,
                    "Click event recorded"
                ),
                Err(e) => {
                    let failure = RecommendationError::FeedbackRecording(e.to_string());
                    warn!(
                        source = event.source_room_id,
                        target = event.target_room_id,
                        error = %failure,
                        "Dropping click event"
                    );
                }
            }
        }))
    }

    pub async fn popularity(&self, room_ids: &[RoomId]) -> Result<HashMap<RoomId, u64>, StoreError> {
        if room_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.store.get_popularity_batch(room_ids).await
    }

    pub async fn co_occurrence(
        &self,
        source: RoomId,
        room_ids: &[RoomId],
    ) -> Result<HashMap<RoomId, f64>, StoreError> {
        if room_ids.is_empty() {
            return Ok(HashMap::new());
        }
        self.store.get_co_occurrence_batch(source, room_ids).await
    }
}

fn validate_click(event: &ClickEvent) -> Result<(), RecommendationError> {
    if event.source_room_id <= 0 || event.target_room_id <= 0 {
        return Err(RecommendationError::Validation(
            "sourceRoomId and targetRoomId must be positive".to_string(),
        ));
    }

    if event.source_room_id == event.target_room_id {
        return Err(RecommendationError::Validation(
            "sourceRoomId and targetRoomId must differ".to_string(),
        ));
    }

    if event.rank == 0 {
        return Err(RecommendationError::Validation(
            "rank is 1-based".to_string(),
        ));
    }

    if !event.similarity_score.is_finite() || event.similarity_score < 0.0 {
        return Err(RecommendationError::Validation(format!(
            "similarityScore must be a non-negative number, got {}",
            event.similarity_score
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryFeedbackStore;
    use crate::types::RecommendationMethod;
    use chrono::Utc;

    fn click(source: RoomId, target: RoomId, rank: u32) -> ClickEvent {
        ClickEvent {
            source_room_id: source,
            target_room_id: target,
            method: RecommendationMethod::Hybrid,
            rank,
            similarity_score: 0.72,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_click_appends_event() {
        let store = Arc::new(InMemoryFeedbackStore::new());
        let recorder = FeedbackRecorder::new(store.clone());

        recorder.record_click(click(1, 2, 1)).unwrap().await.unwrap();

        let events = store.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].target_room_id, 2);
        assert_eq!(events[0].method, RecommendationMethod::Hybrid);
    }

    #[tokio::test]
    async fn test_append_failure_is_swallowed() {
        let store = Arc::new(InMemoryFeedbackStore::new());
        store.set_fail_appends(true);
        let recorder = FeedbackRecorder::new(store.clone());

        let handle = recorder.record_click(click(1, 2, 3)).unwrap();
        assert!(handle.await.is_ok());
        assert!(store.events().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_click_rejected() {
        let recorder = FeedbackRecorder::new(Arc::new(InMemoryFeedbackStore::new()));

        assert!(recorder.record_click(click(4, 4, 1)).is_err());
        assert!(recorder.record_click(click(4, 5, 0)).is_err());

        let mut bad_score = click(4, 5, 1);
        bad_score.similarity_score = f64::NAN;
        assert!(matches!(
            recorder.record_click(bad_score),
            Err(RecommendationError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_skips_store() {
        let store = Arc::new(InMemoryFeedbackStore::new());
        store.set_unavailable(true);
        let recorder = FeedbackRecorder::new(store);

        assert!(recorder.popularity(&[]).await.unwrap().is_empty());
        assert!(recorder.popularity(&[1]).await.is_err());
    }
}
