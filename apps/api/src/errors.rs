use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::resume::ValidationError;

/// Errors raised before a request reaches the pipeline.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Body or query string could not be decoded.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Decoded, but rejected by the validation gate.
    #[error(transparent)]
    InvalidRequest(#[from] ValidationError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = match &self {
            AppError::Validation(msg) => json!({
                "error": {
                    "code": "VALIDATION_ERROR",
                    "message": msg
                }
            }),
            AppError::InvalidRequest(e) => {
                tracing::warn!("Rejected resume request: {e}");
                json!({
                    "error": {
                        "code": "VALIDATION_ERROR",
                        "message": e.to_string(),
                        "fields": e.violations
                    }
                })
            }
        };

        let status = match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };

        (status, Json(body)).into_response()
    }
}
