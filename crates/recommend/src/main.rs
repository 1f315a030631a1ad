//! Room recommendation service
//!
//! Port: 8083 (ROOMFINDER_SERVICE_PORT)

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use roomfinder_core::{
    load_dotenv, ConfigLoader, DatabaseConfig, DatabasePool, LogConfig, ServiceConfig,
};
use roomfinder_recommend::server::{configure_routes, AppState};
use roomfinder_recommend::{
    PostgresFeedbackStore, PostgresRoomStore, RecommendConfig, RecommendationEngine,
};
use std::sync::Arc;
use tracing::info;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let service = ServiceConfig::from_env()?;
    service.validate()?;

    roomfinder_core::init_logging(&LogConfig {
        service_name: "recommend-service".to_string(),
        level: service.log_level.clone(),
        format: service.log_format.parse()?,
    })?;

    let config = RecommendConfig::load().context("Failed to load recommendation config")?;

    let db_config = DatabaseConfig::from_env()?;
    db_config.validate()?;
    let db = DatabasePool::connect_lazy(&db_config)?;

    let rooms = Arc::new(PostgresRoomStore::new(db.pool().clone()));
    let feedback = Arc::new(PostgresFeedbackStore::new(db.pool().clone()));
    let engine = Arc::new(RecommendationEngine::new(config, rooms, feedback)?);

    let state = web::Data::new(AppState::new(engine));

    info!(
        host = %service.host,
        port = service.port,
        workers = service.workers,
        "Starting recommend-service"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(configure_routes)
    })
    .workers(service.workers)
    .bind((service.host.as_str(), service.port))?
    .run()
    .await?;

    Ok(())
}
