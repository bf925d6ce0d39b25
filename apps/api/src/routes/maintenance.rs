//! Storage maintenance endpoints.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::storage::s3_store::BucketInfo;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CleanupParams {
    pub days_old: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub deleted: usize,
    pub days_old: u32,
}

/// POST /api/v1/maintenance/cleanup?days_old=N
///
/// Deletes stored resumes older than `days_old` (default `CLEANUP_DAYS_OLD`).
/// Storage failures report zero deletions rather than an error.
pub async fn handle_cleanup(
    State(state): State<AppState>,
    params: Result<Query<CleanupParams>, QueryRejection>,
) -> Result<Json<CleanupResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::Validation(e.body_text()))?;
    let days_old = params.days_old.unwrap_or(state.config.cleanup_days_old);

    let deleted = state.pipeline.store().cleanup_older_than(days_old).await;
    Ok(Json(CleanupResponse { deleted, days_old }))
}

/// GET /api/v1/storage
pub async fn handle_storage_info(State(state): State<AppState>) -> Json<BucketInfo> {
    Json(state.pipeline.store().bucket_info().await)
}
