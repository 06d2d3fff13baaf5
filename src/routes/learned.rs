use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::response::{ok, AppError};
use crate::services::learned::{self, LearnedError};
use crate::state::AppState;

const EXPORT_FILENAME: &str = "learned-characters.txt";

#[derive(Debug, Deserialize)]
pub struct GlyphQuery {
    #[serde(rename = "char", default)]
    glyph: String,
}

#[derive(Debug, Deserialize)]
pub struct GlyphBody {
    #[serde(rename = "char", default)]
    glyph: String,
}

#[derive(Serialize)]
struct LearnedStatus {
    learned: bool,
}

fn learned_error(err: LearnedError, context: &'static str) -> AppError {
    match err {
        LearnedError::InvalidGlyph => AppError::validation(format!("{context} char 必须是单个汉字。")),
        LearnedError::Sqlx(source) => AppError::persistence("服务器内部错误。", source),
    }
}

pub async fn status(
    State(state): State<AppState>,
    Query(query): Query<GlyphQuery>,
) -> Result<Response, AppError> {
    let learned = learned::is_learned(state.db(), &query.glyph)
        .await
        .map_err(|err| learned_error(err, "查询参数"))?;
    Ok(ok(LearnedStatus { learned }).into_response())
}

pub async fn mark(
    State(state): State<AppState>,
    payload: Result<Json<GlyphBody>, axum::extract::rejection::JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = payload.map_err(|_| AppError::validation("请求体 char 必须是单个汉字。"))?;
    learned::mark_learned(state.db(), &body.glyph)
        .await
        .map_err(|err| learned_error(err, "请求体"))?;
    Ok(ok(LearnedStatus { learned: true }).into_response())
}

pub async fn unmark(
    State(state): State<AppState>,
    payload: Result<Json<GlyphBody>, axum::extract::rejection::JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(body) = payload.map_err(|_| AppError::validation("请求体 char 必须是单个汉字。"))?;
    learned::unmark_learned(state.db(), &body.glyph)
        .await
        .map_err(|err| learned_error(err, "请求体"))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn export(State(state): State<AppState>) -> Result<Response, AppError> {
    let content = learned::export_learned(state.db())
        .await
        .map_err(|err| learned_error(err, "导出"))?;
    let disposition = format!("attachment; filename=\"{EXPORT_FILENAME}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    )
        .into_response())
}
