use crate::cache::{CandidateCache, CandidateCacheKey};
use crate::error::RecommendationError;
use crate::geo::{distance_km, BoundingBox};
use crate::recommendation::RecommendationStage;
use crate::store::{CandidateFilter, RoomStore};
use crate::types::{RecommendationMethod, Room};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Fetches a bounded, distance-ordered candidate set for a target room
pub struct CandidateRetriever {
    store: Arc<dyn RoomStore>,
    cache: Option<Arc<CandidateCache>>,
    candidate_multiplier: usize,
    max_candidates: usize,
    max_scan: usize,
}

impl CandidateRetriever {
    pub fn new(
        store: Arc<dyn RoomStore>,
        candidate_multiplier: usize,
        max_candidates: usize,
        max_scan: usize,
    ) -> Self {
        Self {
            store,
            cache: None,
            candidate_multiplier,
            max_candidates,
            max_scan,
        }
    }

    pub fn with_cache(mut self, cache: Arc<CandidateCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Candidate cap for a requested result limit
    pub fn cap_for(&self, limit: usize) -> usize {
        limit
            .saturating_mul(self.candidate_multiplier)
            .min(self.max_candidates)
            .max(limit)
    }

    /// Retrieve available candidates other than the target
    ///
    /// `max_distance_km` is a hard filter: a bounding box narrows the store
    /// query and the exact haversine check drops anything beyond the radius.
    /// An empty result is reported as `NoCandidates`.
    #[instrument(skip(self, target), fields(target_id = target.id, method = %method))]
    pub async fn retrieve(
        &self,
        target: &Room,
        method: RecommendationMethod,
        limit: usize,
        max_distance_km: Option<f64>,
    ) -> Result<Arc<Vec<Room>>, RecommendationError> {
        let cap = self.cap_for(limit);
        let key = CandidateCacheKey::new(target.id, method, max_distance_km, cap);

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get(&key).await {
                return non_empty(target, cached);
            }
        }

        let origin = (target.latitude(), target.longitude());
        let filter = CandidateFilter {
            exclude_room_id: target.id,
            available_only: true,
            bounding_box: max_distance_km.map(|km| BoundingBox::around(origin.0, origin.1, km)),
            origin,
            limit: self.max_scan.max(cap),
        };

        let scanned = self.store.find_candidates(&filter).await.map_err(|e| {
            RecommendationError::upstream("room_store", RecommendationStage::Retrieving, e)
        })?;
        let scanned_count = scanned.len();

        let mut candidates: Vec<(f64, Room)> = scanned
            .into_iter()
            .filter(|room| room.id != target.id && room.is_available)
            .map(|room| {
                let distance = distance_km(origin.0, origin.1, room.latitude(), room.longitude());
                (distance, room)
            })
            .filter(|(distance, _)| max_distance_km.map_or(true, |max| *distance <= max))
            .collect();

        candidates.sort_by(|(da, a), (db, b)| da.total_cmp(db).then(a.id.cmp(&b.id)));
        candidates.truncate(cap);

        debug!(
            scanned = scanned_count,
            kept = candidates.len(),
            cap,
            "Candidates retrieved"
        );

        let rooms = Arc::new(
            candidates
                .into_iter()
                .map(|(_, room)| room)
                .collect::<Vec<_>>(),
        );

        if let Some(cache) = &self.cache {
            cache.insert(key, Arc::clone(&rooms)).await;
        }

        non_empty(target, rooms)
    }
}

fn non_empty(target: &Room, rooms: Arc<Vec<Room>>) -> Result<Arc<Vec<Room>>, RecommendationError> {
    if rooms.is_empty() {
        Err(RecommendationError::NoCandidates(target.id))
    } else {
        Ok(rooms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryRoomStore;
    use crate::types::Rental;
    use std::time::Duration;

    const ORIGIN: (f64, f64) = (10.0, 106.0);

    // Moves north by `km` along the meridian
    fn room_north(id: i64, km: f64) -> Room {
        Room {
            id,
            title: format!("Room {}", id),
            price: 3_000_000.0,
            area: 25.0,
            is_available: true,
            rental: Rental {
                id: id + 100,
                title: "Rental".into(),
                address: "Street".into(),
                latitude: ORIGIN.0 + (km / crate::geo::EARTH_RADIUS_KM).to_degrees(),
                longitude: ORIGIN.1,
                images: vec![],
            },
            amenities: vec![],
        }
    }

    fn retriever(rooms: Vec<Room>) -> CandidateRetriever {
        CandidateRetriever::new(Arc::new(InMemoryRoomStore::with_rooms(rooms)), 5, 100, 1000)
    }

    #[test]
    fn test_cap_for_limit() {
        let r = retriever(vec![]);
        assert_eq!(r.cap_for(4), 20);
        assert_eq!(r.cap_for(20), 100);
        assert_eq!(r.cap_for(0), 0);

        let tight = CandidateRetriever::new(Arc::new(InMemoryRoomStore::new()), 5, 10, 1000);
        assert_eq!(tight.cap_for(20), 20);
    }

    #[tokio::test]
    async fn test_hard_distance_filter() {
        let target = room_north(1, 0.0);
        let r = retriever(vec![
            target.clone(),
            room_north(2, 4.9),
            room_north(3, 5.1),
        ]);

        let rooms = r
            .retrieve(&target, RecommendationMethod::LocationBased, 4, Some(5.0))
            .await
            .unwrap();

        let ids: Vec<i64> = rooms.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[tokio::test]
    async fn test_no_radius_keeps_far_rooms() {
        let target = room_north(1, 0.0);
        let r = retriever(vec![target.clone(), room_north(2, 500.0)]);

        let rooms = r
            .retrieve(&target, RecommendationMethod::Popularity, 4, None)
            .await
            .unwrap();
        assert_eq!(rooms.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_set_is_no_candidates() {
        let target = room_north(1, 0.0);
        let mut unavailable = room_north(2, 1.0);
        unavailable.is_available = false;
        let r = retriever(vec![target.clone(), unavailable]);

        let err = r
            .retrieve(&target, RecommendationMethod::ContentBased, 4, Some(10.0))
            .await
            .unwrap_err();
        assert!(matches!(err, RecommendationError::NoCandidates(1)));
    }

    #[tokio::test]
    async fn test_cap_keeps_nearest() {
        let target = room_north(1, 0.0);
        let rooms: Vec<Room> = (2..=30).map(|id| room_north(id, id as f64 * 0.1)).collect();
        let r = CandidateRetriever::new(
            Arc::new(InMemoryRoomStore::with_rooms(rooms.into_iter().chain([target.clone()]))),
            2,
            100,
            1000,
        );

        let result = r
            .retrieve(&target, RecommendationMethod::ContentBased, 3, Some(10.0))
            .await
            .unwrap();
        let ids: Vec<i64> = result.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3, 4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn test_cache_serves_repeat_requests() {
        let target = room_north(1, 0.0);
        let store = Arc::new(InMemoryRoomStore::with_rooms(vec![
            target.clone(),
            room_north(2, 1.0),
        ]));
        let cache = Arc::new(CandidateCache::new(Duration::from_secs(60), 16));
        let r = CandidateRetriever::new(store.clone(), 5, 100, 1000).with_cache(cache.clone());

        r.retrieve(&target, RecommendationMethod::ContentBased, 4, Some(10.0))
            .await
            .unwrap();
        assert_eq!(cache.len().await, 1);

        store.set_unavailable(true);
        let cached = r
            .retrieve(&target, RecommendationMethod::ContentBased, 4, Some(10.0))
            .await
            .unwrap();
        assert_eq!(cached.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_is_upstream_error() {
        let target = room_north(1, 0.0);
        let store = Arc::new(InMemoryRoomStore::new());
        store.set_unavailable(true);
        let r = CandidateRetriever::new(store, 5, 100, 1000);

        let err = r
            .retrieve(&target, RecommendationMethod::ContentBased, 4, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RecommendationError::UpstreamStore {
                component: "room_store",
                stage: RecommendationStage::Retrieving,
                ..
            }
        ));
    }
}
