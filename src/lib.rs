pub mod cache;
pub mod config;
pub mod db;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use std::any::Any;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::{Database, DbInitError};
use crate::response::AppError;
use crate::services::pinyin::PinyinResolver;
use crate::state::AppState;

/// Opens the database from `config` and builds the router without a
/// listing cache.
pub async fn create_app(config: &Config) -> Result<axum::Router, DbInitError> {
    let db = Database::connect(&config.database_url).await?;
    let resolver = Arc::new(PinyinResolver::new(&config.pinyin_overrides_path));
    Ok(build_router(AppState::new(db, resolver, None)))
}

pub fn build_router(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "handler panicked".to_string());
    AppError::internal(detail).into_response()
}
