//! Shared fixtures for recommendation integration tests

#![allow(dead_code)]

use roomfinder_recommend::{
    Amenity, InMemoryFeedbackStore, InMemoryRoomStore, RecommendConfig, RecommendationEngine,
    Rental, Room, RoomId,
};
use std::f64::consts::PI;
use std::sync::Arc;

/// District 1, Ho Chi Minh City
pub const BASE_LAT: f64 = 10.7769;
pub const BASE_LNG: f64 = 106.7009;

const AMENITY_NAMES: [&str; 6] = [
    "Wifi",
    "Air conditioning",
    "Parking",
    "Washing machine",
    "Balcony",
    "Kitchen",
];

pub fn amenity(id: i64) -> Amenity {
    let name = usize::try_from(id - 1)
        .ok()
        .and_then(|i| AMENITY_NAMES.get(i))
        .map(|n| n.to_string())
        .unwrap_or_else(|| format!("Amenity {}", id));
    Amenity { id, name }
}

/// Available room `km_north` kilometres due north of the base point
pub fn room(id: RoomId, km_north: f64, price: f64, area: f64, amenities: &[i64]) -> Room {
    let latitude = BASE_LAT + km_north * 180.0 / (PI * 6371.0);
    Room {
        id,
        title: format!("Room {}", id),
        price,
        area,
        is_available: true,
        rental: Rental {
            id: 100 + id,
            title: format!("Rental {}", id),
            address: format!("{} Nguyen Hue", id),
            latitude,
            longitude: BASE_LNG,
            images: vec![format!("https://img.example/{}.jpg", id)],
        },
        amenities: amenities.iter().copied().map(amenity).collect(),
    }
}

pub fn unavailable(mut room: Room) -> Room {
    room.is_available = false;
    room
}

pub struct Fixture {
    pub engine: Arc<RecommendationEngine>,
    pub rooms: Arc<InMemoryRoomStore>,
    pub feedback: Arc<InMemoryFeedbackStore>,
}

pub fn fixture(rooms: Vec<Room>) -> Fixture {
    fixture_with(RecommendConfig::default(), rooms)
}

pub fn fixture_with(config: RecommendConfig, rooms: Vec<Room>) -> Fixture {
    let room_store = Arc::new(InMemoryRoomStore::with_rooms(rooms));
    let feedback = Arc::new(InMemoryFeedbackStore::new());
    let engine = RecommendationEngine::new(config, room_store.clone(), feedback.clone())
        .expect("valid engine configuration");

    Fixture {
        engine: Arc::new(engine),
        rooms: room_store,
        feedback,
    }
}

/// Config with the candidate cache off, for tests that mutate the stores
/// between requests
pub fn uncached_config() -> RecommendConfig {
    let mut config = RecommendConfig::default();
    config.cache.enabled = false;
    config
}

/// A target room plus a neighbourhood of varied candidates
pub fn neighbourhood() -> Vec<Room> {
    vec![
        room(1, 0.0, 3_000_000.0, 25.0, &[1, 2, 3]),
        room(2, 0.5, 3_100_000.0, 24.0, &[1, 2, 3]),
        room(3, 1.2, 2_500_000.0, 30.0, &[1, 2]),
        room(4, 2.0, 4_000_000.0, 20.0, &[1]),
        room(5, 3.5, 3_000_000.0, 25.0, &[4, 5]),
        room(6, 4.0, 6_000_000.0, 45.0, &[1, 2, 3, 6]),
        room(7, 6.0, 2_800_000.0, 26.0, &[]),
        room(8, 8.5, 3_300_000.0, 22.0, &[2, 3]),
        unavailable(room(9, 0.3, 3_000_000.0, 25.0, &[1, 2, 3])),
        room(10, 25.0, 3_000_000.0, 25.0, &[1, 2, 3]),
    ]
}

pub fn ids(response: &roomfinder_recommend::RecommendationsResponse) -> Vec<RoomId> {
    response.data.iter().map(|r| r.room.id).collect()
}
