use actix_web::{web, HttpResponse};
use serde::Deserialize;

use super::AppState;
use crate::error::RecommendationError;
use crate::types::{ApiResponse, ClickEvent, RecommendationMethod, RecommendationRequest, RoomId};

/// Query string accepted by the per-room endpoint
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationQuery {
    pub limit: Option<usize>,
    pub method: Option<String>,
    pub max_distance_km: Option<f64>,
    pub price_variance: Option<f64>,
    pub area_variance: Option<f64>,
    pub last_viewed_room_id: Option<RoomId>,
}

impl RecommendationQuery {
    fn into_request(self, room_id: RoomId) -> Result<RecommendationRequest, RecommendationError> {
        let method = self
            .method
            .as_deref()
            .map(str::parse::<RecommendationMethod>)
            .transpose()
            .map_err(|e| RecommendationError::Validation(e.to_string()))?;

        Ok(RecommendationRequest {
            room_id: Some(room_id),
            last_viewed_room_id: self.last_viewed_room_id,
            limit: self.limit,
            method,
            max_distance_km: self.max_distance_km,
            price_variance: self.price_variance,
            area_variance: self.area_variance,
            weights: None,
            hybrid_weights: None,
        })
    }
}

/// GET /api/v1/rooms/{room_id}/recommendations
pub async fn get_room_recommendations(
    state: web::Data<AppState>,
    path: web::Path<RoomId>,
    query: web::Query<RecommendationQuery>,
) -> Result<HttpResponse, RecommendationError> {
    let request = query.into_inner().into_request(path.into_inner())?;
    let response = state.engine.get_recommendations(request).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Recommendations retrieved successfully",
        response,
    )))
}

/// POST /api/v1/recommendations
pub async fn post_recommendations(
    state: web::Data<AppState>,
    body: web::Json<RecommendationRequest>,
) -> Result<HttpResponse, RecommendationError> {
    let response = state.engine.get_recommendations(body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(
        "Recommendations retrieved successfully",
        response,
    )))
}

/// POST /api/v1/recommendations/track-click
///
/// Answers once the event is validated; the write happens in the background.
pub async fn track_click(
    state: web::Data<AppState>,
    body: web::Json<ClickEvent>,
) -> Result<HttpResponse, RecommendationError> {
    state.engine.track_click(body.into_inner())?;
    Ok(HttpResponse::Accepted().json(ApiResponse::ack("Click tracked")))
}
