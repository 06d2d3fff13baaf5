use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

const GENERIC_INTERNAL_MESSAGE: &str = "服务器内部错误";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<SuccessResponse<T>> {
    Json(SuccessResponse {
        success: true,
        data,
    })
}

/// Error returned by every handler.
///
/// Operational errors (bad input, missing rows, conflicts) show their message
/// to the caller. Non-operational ones (storage failures, bugs) replace it
/// with a generic message and keep the underlying cause in `detail`, which is
/// logged and only echoed back in debug builds.
#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
    detail: Option<String>,
    is_operational: bool,
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::CONFLICT, "CONFLICT", message)
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::UNPROCESSABLE_ENTITY, "ENCODING_ERROR", message)
    }

    pub fn persistence(message: impl Into<String>, detail: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "PERSISTENCE_ERROR",
            message: message.into(),
            detail: Some(detail.to_string()),
            is_operational: false,
        }
    }

    pub fn internal(detail: impl ToString) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR",
            message: GENERIC_INTERNAL_MESSAGE.to_string(),
            detail: Some(detail.to_string()),
            is_operational: false,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    fn operational(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            detail: None,
            is_operational: true,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::persistence("数据库操作失败", err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if !self.is_operational {
            tracing::error!(
                code = self.code,
                detail = self.detail.as_deref().unwrap_or_default(),
                "request failed"
            );
        }

        let details = if !self.is_operational && cfg!(debug_assertions) {
            self.detail
        } else {
            None
        };

        let body = ErrorResponse {
            success: false,
            error: self.message,
            code: self.code,
            details,
        };

        (self.status, Json(body)).into_response()
    }
}
