//! Tag handlers.

use axum::{
    Json,
    extract::{Path, rejection::PathRejection},
};
use db::repositories::JobRepository;
use lens_core::JobPage;

use crate::ApiError;

/// Every tag in use, sorted.
pub async fn list_tags() -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(JobRepository::tags().await?))
}

pub async fn tagged_jobs(
    path: Result<Path<(String, u64, u64)>, PathRejection>,
) -> Result<Json<JobPage>, ApiError> {
    let Path((tag, start, limit)) = path?;
    Ok(Json(JobRepository::tagged(&tag, start, limit).await?))
}
