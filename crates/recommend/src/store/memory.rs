use super::{CandidateFilter, FeedbackStore, RoomStore};
use crate::error::StoreError;
use crate::geo::distance_km;
use crate::types::{ClickEvent, Room, RoomId};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// In-process room store for tests and local runs
#[derive(Default)]
pub struct InMemoryRoomStore {
    rooms: DashMap<RoomId, Room>,
    unavailable: AtomicBool,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rooms(rooms: impl IntoIterator<Item = Room>) -> Self {
        let store = Self::new();
        for room in rooms {
            store.insert(room);
        }
        store
    }

    pub fn insert(&self, room: Room) {
        self.rooms.insert(room.id, room);
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Make every read fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("room store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn find_room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        self.check_available()?;
        Ok(self.rooms.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Room>, StoreError> {
        self.check_available()?;

        let (origin_lat, origin_lng) = filter.origin;
        let mut matches: Vec<(f64, Room)> = self
            .rooms
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|room| room.id != filter.exclude_room_id)
            .filter(|room| !filter.available_only || room.is_available)
            .filter(|room| {
                filter
                    .bounding_box
                    .map_or(true, |bbox| bbox.contains(room.latitude(), room.longitude()))
            })
            .map(|room| {
                let distance =
                    distance_km(origin_lat, origin_lng, room.latitude(), room.longitude());
                (distance, room)
            })
            .collect();

        matches.sort_by(|(da, a), (db, b)| da.total_cmp(db).then(a.id.cmp(&b.id)));
        matches.truncate(filter.limit);

        Ok(matches.into_iter().map(|(_, room)| room).collect())
    }
}

/// In-process feedback store
///
/// Aggregates are set directly by tests; appended events are kept for
/// inspection and are never folded back into the aggregates.
#[derive(Default)]
pub struct InMemoryFeedbackStore {
    popularity: DashMap<RoomId, u64>,
    co_occurrence: DashMap<(RoomId, RoomId), f64>,
    events: Mutex<Vec<ClickEvent>>,
    fail_appends: AtomicBool,
    unavailable: AtomicBool,
}

impl InMemoryFeedbackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_popularity(&self, room_id: RoomId, count: u64) {
        self.popularity.insert(room_id, count);
    }

    pub fn set_co_occurrence(&self, room_a: RoomId, room_b: RoomId, strength: f64) {
        self.co_occurrence
            .insert(Self::pair(room_a, room_b), strength);
    }

    /// Snapshot of every appended click event, oldest first
    pub fn events(&self) -> Vec<ClickEvent> {
        self.events.lock().clone()
    }

    /// Make `append_click_event` fail while leaving reads intact
    pub fn set_fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    /// Make every aggregate read fail with `StoreError::Unavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn pair(a: RoomId, b: RoomId) -> (RoomId, RoomId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("feedback store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedbackStore for InMemoryFeedbackStore {
    async fn get_popularity(&self, room_id: RoomId) -> Result<u64, StoreError> {
        self.check_available()?;
        Ok(self.popularity.get(&room_id).map(|c| *c).unwrap_or(0))
    }

    async fn get_co_occurrence(
        &self,
        room_a: RoomId,
        room_b: RoomId,
    ) -> Result<f64, StoreError> {
        self.check_available()?;
        Ok(self
            .co_occurrence
            .get(&Self::pair(room_a, room_b))
            .map(|s| *s)
            .unwrap_or(0.0))
    }

    async fn append_click_event(&self, event: &ClickEvent) -> Result<(), StoreError> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("click log rejected write".to_string()));
        }
        self.events.lock().push(event.clone());
        Ok(())
    }
}
