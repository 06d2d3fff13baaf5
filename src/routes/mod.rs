mod character_sets;
mod health;
mod learned;
mod pinyin;
mod review;

use axum::extract::DefaultBodyLimit;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::Router;

use crate::response::AppError;
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .route(
            "/api/characters",
            get(character_sets::list)
                .post(character_sets::create)
                .fallback(fallback_handler),
        )
        .route(
            "/api/characters/import",
            post(character_sets::import)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
                .fallback(fallback_handler),
        )
        .route(
            "/api/characters/:id",
            get(character_sets::get_one)
                .delete(character_sets::delete)
                .fallback(fallback_handler),
        )
        .route(
            "/api/characters/character/:id/pinyin",
            patch(character_sets::update_pinyin).fallback(fallback_handler),
        )
        .route(
            "/api/pinyin/:char",
            get(pinyin::resolve).fallback(fallback_handler),
        )
        .route(
            "/api/learned",
            get(learned::status)
                .post(learned::mark)
                .delete(learned::unmark)
                .fallback(fallback_handler),
        )
        .route(
            "/api/learned/export",
            get(learned::export).fallback(fallback_handler),
        )
        .route(
            "/api/review/sessions",
            post(review::start).fallback(fallback_handler),
        )
        .route(
            "/api/review/sessions/:id",
            get(review::current)
                .delete(review::end)
                .fallback(fallback_handler),
        )
        .route(
            "/api/review/sessions/:id/next",
            post(review::next).fallback(fallback_handler),
        )
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    AppError::not_found("接口不存在").into_response()
}
