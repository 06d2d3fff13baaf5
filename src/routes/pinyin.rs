use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};

use crate::response::{ok, AppError};
use crate::services::pinyin::single_code_point;
use crate::state::AppState;

pub async fn resolve(
    State(state): State<AppState>,
    Path(input): Path<String>,
) -> Result<Response, AppError> {
    if single_code_point(input.trim()).is_none() {
        return Err(AppError::validation("char 必须是单个汉字。"));
    }

    let readings = state.resolver().resolve(&input);
    if readings.is_empty() {
        tracing::debug!(glyph = %input, "no pinyin reading");
        return Err(AppError::not_found("未找到该字的拼音。"));
    }
    Ok(ok(readings).into_response())
}
