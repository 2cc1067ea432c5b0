// ---------------------------------------------------------------------------
// API error types
// ---------------------------------------------------------------------------

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use threatwatch_db::DbError;
use threatwatch_engine::EngineError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub message: String,
}

/// Quota refusals carry the numbers the caller needs to reason about the
/// refusal, not just a message.
#[derive(Debug, Serialize)]
pub struct QuotaErrorBody {
    pub error: String,
    pub message: String,
    pub current_usage: i64,
    pub limit: i64,
}

#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request — invalid input.
    BadRequest(String),
    /// 401 Unauthorized — missing or invalid token.
    Unauthorized(String),
    /// 403 Forbidden — monthly quota exhausted.
    QuotaExceeded {
        message: String,
        current_usage: i64,
        limit: i64,
    },
    /// 404 Not Found — unknown organization, target, scan, or finding.
    NotFound(String),
    /// 409 Conflict — operation not valid in current state.
    Conflict(String),
    /// 500 Internal Server Error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::QuotaExceeded {
            message,
            current_usage,
            limit,
        } = self
        {
            return (
                StatusCode::FORBIDDEN,
                Json(QuotaErrorBody {
                    error: "quota_exceeded".into(),
                    message,
                    current_usage,
                    limit,
                }),
            )
                .into_response();
        }

        let (status, error_key, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::QuotaExceeded { .. } => unreachable!("handled above"),
            ApiError::Internal(msg) => {
                // Log the real error server-side, return a generic message to
                // the client to avoid leaking internal details.
                tracing::error!(details = %msg, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
        };

        (
            status,
            Json(ApiErrorBody {
                error: error_key.into(),
                message,
            }),
        )
            .into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(msg) => ApiError::NotFound(msg),
            DbError::Conflict(msg) => ApiError::Conflict(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::OrganizationNotFound(id) => {
                ApiError::NotFound(format!("organization {id} not found"))
            }
            EngineError::Db(db) => db.into(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "bad request: {msg}"),
            ApiError::Unauthorized(msg) => write!(f, "unauthorized: {msg}"),
            ApiError::QuotaExceeded {
                current_usage,
                limit,
                ..
            } => write!(f, "quota exceeded: {current_usage}/{limit}"),
            ApiError::NotFound(msg) => write!(f, "not found: {msg}"),
            ApiError::Conflict(msg) => write!(f, "conflict: {msg}"),
            ApiError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}
