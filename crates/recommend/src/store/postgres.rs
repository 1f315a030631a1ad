use super::{CandidateFilter, FeedbackStore, RoomStore};
use crate::error::StoreError;
use crate::types::{Amenity, ClickEvent, Rental, Room, RoomId};
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Convert a textual NUMERIC value to `f64`
///
/// Price, area and coordinates are stored as arbitrary-precision decimals.
/// They are selected as text and converted here, once, so nothing past the
/// adapter sees database numeric types.
pub fn decimal_to_f64(column: &str, raw: &str) -> Result<f64, StoreError> {
    let value: f64 = raw.trim().parse().map_err(|e| {
        StoreError::Decode(format!("column {} holds non-numeric value '{}': {}", column, raw, e))
    })?;

    if !value.is_finite() {
        return Err(StoreError::Decode(format!(
            "column {} holds non-finite value '{}'",
            column, raw
        )));
    }

    Ok(value)
}

#[derive(Debug, sqlx::FromRow)]
struct RoomRow {
    id: i64,
    title: String,
    price: String,
    area: String,
    is_available: bool,
    rental_id: i64,
    rental_title: String,
    address: String,
    latitude: String,
    longitude: String,
    images: Vec<String>,
    amenity_ids: Vec<i64>,
    amenity_names: Vec<String>,
}

impl TryFrom<RoomRow> for Room {
    type Error = StoreError;

    fn try_from(row: RoomRow) -> Result<Self, Self::Error> {
        let amenities = row
            .amenity_ids
            .into_iter()
            .zip(row.amenity_names)
            .map(|(id, name)| Amenity { id, name })
            .collect();

        Ok(Room {
            id: row.id,
            title: row.title,
            price: decimal_to_f64("rooms.price", &row.price)?,
            area: decimal_to_f64("rooms.area", &row.area)?,
            is_available: row.is_available,
            rental: Rental {
                id: row.rental_id,
                title: row.rental_title,
                address: row.address,
                latitude: decimal_to_f64("rentals.latitude", &row.latitude)?,
                longitude: decimal_to_f64("rentals.longitude", &row.longitude)?,
                images: row.images,
            },
            amenities,
        })
    }
}

const ROOM_COLUMNS: &str = r#"
    SELECT r.id, r.title, r.price::TEXT AS price, r.area::TEXT AS area, r.is_available,
           rt.id AS rental_id, rt.title AS rental_title, rt.address,
           rt.latitude::TEXT AS latitude, rt.longitude::TEXT AS longitude,
           COALESCE(rt.images, ARRAY[]::TEXT[]) AS images,
           COALESCE(array_agg(a.id ORDER BY a.id) FILTER (WHERE a.id IS NOT NULL), ARRAY[]::BIGINT[]) AS amenity_ids,
           COALESCE(array_agg(a.name ORDER BY a.id) FILTER (WHERE a.id IS NOT NULL), ARRAY[]::TEXT[]) AS amenity_names
    FROM rooms r
    JOIN rentals rt ON rt.id = r.rental_id
    LEFT JOIN room_amenities ra ON ra.room_id = r.id
    LEFT JOIN amenities a ON a.id = ra.amenity_id
"#;

/// Room/rental read store over PostgreSQL
pub struct PostgresRoomStore {
    pool: PgPool,
}

impl PostgresRoomStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomStore for PostgresRoomStore {
    #[instrument(skip(self))]
    async fn find_room(&self, id: RoomId) -> Result<Option<Room>, StoreError> {
        let query = format!("{} WHERE r.id = $1 GROUP BY r.id, rt.id", ROOM_COLUMNS);

        let row = sqlx::query_as::<_, RoomRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Room::try_from).transpose()
    }

    #[instrument(skip(self, filter), fields(exclude = filter.exclude_room_id, limit = filter.limit))]
    async fn find_candidates(&self, filter: &CandidateFilter) -> Result<Vec<Room>, StoreError> {
        let query = format!(
            r#"{}
            WHERE r.id <> $1
              AND ($2 = FALSE OR r.is_available)
              AND ($3::FLOAT8 IS NULL OR rt.latitude::FLOAT8 BETWEEN $3 AND $4)
              AND ($5::FLOAT8 IS NULL OR rt.longitude::FLOAT8 BETWEEN $5 AND $6)
            GROUP BY r.id, rt.id
            ORDER BY power(rt.latitude::FLOAT8 - $7, 2)
                   + power((rt.longitude::FLOAT8 - $8) * cos(radians($7)), 2),
                     r.id
            LIMIT $9
            "#,
            ROOM_COLUMNS
        );

        let bbox = filter.bounding_box;
        let rows = sqlx::query_as::<_, RoomRow>(&query)
            .bind(filter.exclude_room_id)
            .bind(filter.available_only)
            .bind(bbox.map(|b| b.min_lat))
            .bind(bbox.map(|b| b.max_lat))
            .bind(bbox.map(|b| b.min_lng))
            .bind(bbox.map(|b| b.max_lng))
            .bind(filter.origin.0)
            .bind(filter.origin.1)
            .bind(i64::try_from(filter.limit).unwrap_or(i64::MAX))
            .fetch_all(&self.pool)
            .await?;

        debug!(rows = rows.len(), "Fetched candidate rows");

        rows.into_iter().map(Room::try_from).collect()
    }
}

/// Feedback aggregates and click log over PostgreSQL
///
/// `room_popularity` and `room_co_occurrence` are maintained by an external
/// batch job; this adapter only reads them.
pub struct PostgresFeedbackStore {
    pool: PgPool,
}

impl PostgresFeedbackStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn canonical_pair(a: RoomId, b: RoomId) -> (RoomId, RoomId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn clamp_count(count: i64) -> u64 {
    u64::try_from(count).unwrap_or(0)
}

#[async_trait]
impl FeedbackStore for PostgresFeedbackStore {
    async fn get_popularity(&self, room_id: RoomId) -> Result<u64, StoreError> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT click_count FROM room_popularity WHERE room_id = $1")
                .bind(room_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(count.map(clamp_count).unwrap_or(0))
    }

    async fn get_co_occurrence(
        &self,
        room_a: RoomId,
        room_b: RoomId,
    ) -> Result<f64, StoreError> {
        let (low, high) = canonical_pair(room_a, room_b);
        let strength: Option<f64> = sqlx::query_scalar(
            "SELECT strength FROM room_co_occurrence WHERE room_a = $1 AND room_b = $2",
        )
        .bind(low)
        .bind(high)
        .fetch_optional(&self.pool)
        .await?;

        Ok(strength.unwrap_or(0.0))
    }

    #[instrument(skip(self, event), fields(source = event.source_room_id, target = event.target_room_id))]
    async fn append_click_event(&self, event: &ClickEvent) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO recommendation_clicks
                (id, source_room_id, target_room_id, method, rank, similarity_score, clicked_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(event.source_room_id)
        .bind(event.target_room_id)
        .bind(event.method.as_str())
        .bind(i32::try_from(event.rank).unwrap_or(i32::MAX))
        .bind(event.similarity_score)
        .bind(event.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self, room_ids), fields(rooms = room_ids.len()))]
    async fn get_popularity_batch(
        &self,
        room_ids: &[RoomId],
    ) -> Result<HashMap<RoomId, u64>, StoreError> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT room_id, click_count FROM room_popularity WHERE room_id = ANY($1)",
        )
        .bind(room_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, clamp_count(count)))
            .filter(|(_, count)| *count > 0)
            .collect())
    }

    #[instrument(skip(self, room_ids), fields(rooms = room_ids.len()))]
    async fn get_co_occurrence_batch(
        &self,
        source: RoomId,
        room_ids: &[RoomId],
    ) -> Result<HashMap<RoomId, f64>, StoreError> {
        let rows: Vec<(i64, f64)> = sqlx::query_as(
            r#"
            SELECT CASE WHEN room_a = $1 THEN room_b ELSE room_a END AS room_id, strength
            FROM room_co_occurrence
            WHERE (room_a = $1 AND room_b = ANY($2))
               OR (room_b = $1 AND room_a = ANY($2))
            "#,
        )
        .bind(source)
        .bind(room_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter(|(_, strength)| *strength != 0.0)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_to_f64_parses_numeric_text() {
        assert_eq!(decimal_to_f64("price", "3000000.00").unwrap(), 3_000_000.0);
        assert_eq!(decimal_to_f64("area", " 25.5 ").unwrap(), 25.5);
        assert_eq!(decimal_to_f64("latitude", "-33.8688").unwrap(), -33.8688);
    }

    #[test]
    fn test_decimal_to_f64_rejects_garbage() {
        let err = decimal_to_f64("rooms.price", "abc").unwrap_err();
        assert!(matches!(err, StoreError::Decode(_)));
        assert!(err.to_string().contains("rooms.price"));

        assert!(decimal_to_f64("rooms.price", "NaN").is_err());
    }

    #[test]
    fn test_canonical_pair_orders_ids() {
        assert_eq!(canonical_pair(9, 4), (4, 9));
        assert_eq!(canonical_pair(4, 9), (4, 9));
    }

    #[test]
    fn test_room_row_conversion() {
        let row = RoomRow {
            id: 1,
            title: "Studio".into(),
            price: "2500000".into(),
            area: "20.00".into(),
            is_available: true,
            rental_id: 10,
            rental_title: "Riverside".into(),
            address: "1 River Rd".into(),
            latitude: "21.0285".into(),
            longitude: "105.8542".into(),
            images: vec!["a.jpg".into()],
            amenity_ids: vec![1, 2],
            amenity_names: vec!["Wifi".into(), "Parking".into()],
        };

        let room = Room::try_from(row).unwrap();
        assert_eq!(room.price, 2_500_000.0);
        assert_eq!(room.rental.latitude, 21.0285);
        assert_eq!(room.amenities.len(), 2);
        assert_eq!(room.amenities[1].name, "Parking");
    }
}
