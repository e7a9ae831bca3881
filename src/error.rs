//! HTTP-layer error type. Protocol-level responses (e.g. "not a leader",
//! "no command") are plain-text and are returned directly by the handlers
//! in `http.rs` -- they never go through `AppError`, since they aren't
//! failures of the HTTP layer itself.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("malformed request body: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    request_id: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let id = Uuid::new_v4().to_string();
        let status = self.status();
        tracing::warn!(id = %id, %status, "request failed: {}", self);
        let body = ErrorBody { error: self.to_string(), request_id: id };
        (status, Json(body)).into_response()
    }
}
