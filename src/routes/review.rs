use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::services::review::{AdvanceError, ReviewSessionError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    #[serde(default)]
    character_set_id: Option<String>,
}

impl From<ReviewSessionError> for AppError {
    fn from(err: ReviewSessionError) -> Self {
        match err {
            ReviewSessionError::SessionNotFound
            | ReviewSessionError::SetNotFound
            | ReviewSessionError::NoDefaultSet => {
                AppError::not_found(err.to_string())
            }
            ReviewSessionError::Advance(AdvanceError::NotEnoughCharacters) => {
                AppError::validation(err.to_string())
            }
            ReviewSessionError::Sqlx(source) => AppError::persistence("开始复习失败", source),
        }
    }
}

pub async fn start(
    State(state): State<AppState>,
    payload: Result<Json<StartSessionRequest>, axum::extract::rejection::JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload.map_err(|_| AppError::validation("请求参数不合法"))?;
    let sessions = state.review_sessions();
    let card = match body.character_set_id.as_deref() {
        Some(set_id) => sessions.start_for_set(state.db(), set_id).await?,
        None => sessions.start_for_default(state.db()).await?,
    };
    Ok((StatusCode::CREATED, ok(card)).into_response())
}

pub async fn current(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    let card = state
        .review_sessions()
        .get(&session_id)
        .ok_or(ReviewSessionError::SessionNotFound)?;
    Ok(ok(card).into_response())
}

pub async fn next(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, AppError> {
    let card = state.review_sessions().advance(&session_id)?;
    Ok(ok(card).into_response())
}

pub async fn end(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.review_sessions().end(&session_id) {
        return Err(ReviewSessionError::SessionNotFound.into());
    }
    Ok(StatusCode::NO_CONTENT)
}
