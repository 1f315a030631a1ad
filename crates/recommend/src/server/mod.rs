pub mod handlers;

pub use handlers::{get_room_recommendations, post_recommendations, track_click};

use actix_web::{error::InternalError, web, HttpResponse, Responder};
use serde::Serialize;
use std::sync::Arc;

use crate::error::RecommendationError;
use crate::recommendation::RecommendationEngine;

/// Application state shared across all handlers
pub struct AppState {
    pub engine: Arc<RecommendationEngine>,
}

impl AppState {
    pub fn new(engine: Arc<RecommendationEngine>) -> Self {
        Self { engine }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    service: String,
    version: String,
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "recommend-service".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Malformed JSON bodies and query strings answer with the error envelope
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        InternalError::from_response(
            err,
            actix_web::ResponseError::error_response(&RecommendationError::Validation(message)),
        )
        .into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        InternalError::from_response(
            err,
            actix_web::ResponseError::error_response(&RecommendationError::Validation(message)),
        )
        .into()
    })
}

/// Configure application routes
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .route("/health", web::get().to(health))
        .service(
            web::scope("/api/v1")
                .route(
                    "/rooms/{room_id}/recommendations",
                    web::get().to(handlers::get_room_recommendations),
                )
                .route(
                    "/recommendations",
                    web::post().to(handlers::post_recommendations),
                )
                .route(
                    "/recommendations/track-click",
                    web::post().to(handlers::track_click),
                ),
        );
}
