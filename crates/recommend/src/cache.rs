//! Short-lived candidate cache
//!
//! Entries expire by TTL only. Nothing the engine writes invalidates them.

use crate::types::{RecommendationMethod, Room, RoomId};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CandidateCacheKey {
    pub room_id: RoomId,
    pub method: RecommendationMethod,
    /// Bit pattern of the effective hard-filter radius
    pub max_distance_bits: Option<u64>,
    pub cap: usize,
}

impl CandidateCacheKey {
    pub fn new(
        room_id: RoomId,
        method: RecommendationMethod,
        max_distance_km: Option<f64>,
        cap: usize,
    ) -> Self {
        Self {
            room_id,
            method,
            max_distance_bits: max_distance_km.map(f64::to_bits),
            cap,
        }
    }
}

/// Retrieved candidate sets keyed by target room, method, radius and cap
pub struct CandidateCache {
    entries: Cache<CandidateCacheKey, Arc<Vec<Room>>>,
}

impl CandidateCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        let entries = Cache::builder()
            .max_capacity(u64::try_from(max_entries.max(1)).unwrap_or(u64::MAX))
            .time_to_live(ttl)
            .build();

        Self { entries }
    }

    pub async fn get(&self, key: &CandidateCacheKey) -> Option<Arc<Vec<Room>>> {
        let rooms = self.entries.get(key).await?;
        debug!(room_id = key.room_id, method = %key.method, "Candidate cache hit");
        Some(rooms)
    }

    pub async fn insert(&self, key: CandidateCacheKey, rooms: Arc<Vec<Room>>) {
        self.entries.insert(key, rooms).await;
    }

    /// Entry count after pending evictions have been applied
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(room_id: RoomId) -> CandidateCacheKey {
        CandidateCacheKey::new(room_id, RecommendationMethod::ContentBased, Some(10.0), 20)
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let cache = CandidateCache::new(Duration::from_secs(60), 8);
        cache.insert(key(1), Arc::new(vec![])).await;

        assert!(cache.get(&key(1)).await.is_some());
        assert!(cache.get(&key(2)).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let cache = CandidateCache::new(Duration::from_millis(20), 8);
        cache.insert(key(1), Arc::new(vec![])).await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(cache.get(&key(1)).await.is_none());
        assert!(cache.is_empty().await);
    }

    #[test]
    fn test_key_includes_distance_and_method() {
        let a = CandidateCacheKey::new(1, RecommendationMethod::Popularity, None, 20);
        let b = CandidateCacheKey::new(1, RecommendationMethod::Popularity, Some(5.0), 20);
        let c = CandidateCacheKey::new(1, RecommendationMethod::Hybrid, None, 20);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_bounded_by_max_entries() {
        let cache = CandidateCache::new(Duration::from_secs(60), 2);
        for room_id in 1..=10 {
            cache.insert(key(room_id), Arc::new(vec![])).await;
        }

        assert!(cache.len().await <= 2);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_stay_bounded() {
        let cache = Arc::new(CandidateCache::new(Duration::from_secs(60), 2));
        let tasks: Vec<_> = (1..=16)
            .map(|room_id| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    for round in 0..20 {
                        cache
                            .insert(key(room_id * 100 + round), Arc::new(vec![]))
                            .await;
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(cache.len().await <= 2);
    }
}
