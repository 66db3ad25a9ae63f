//! Queue handlers.

use axum::{
    Json,
    extract::{Path, rejection::PathRejection},
};
use db::repositories::{JobRepository, QueueRepository};
use lens_core::{JobPage, JobState, QueueCounts, QueueStats};

use crate::ApiError;

/// Counts for every known queue.
pub async fn list_queues() -> Result<Json<Vec<QueueCounts>>, ApiError> {
    Ok(Json(QueueRepository::counts().await?))
}

/// Counts for one queue.
pub async fn get_queue(Path(name): Path<String>) -> Result<Json<QueueCounts>, ApiError> {
    Ok(Json(QueueRepository::counts_for(&name).await?))
}

pub async fn pause_queue(Path(name): Path<String>) -> Result<Json<QueueCounts>, ApiError> {
    Ok(Json(QueueRepository::set_paused(&name, true).await?))
}

pub async fn unpause_queue(Path(name): Path<String>) -> Result<Json<QueueCounts>, ApiError> {
    Ok(Json(QueueRepository::set_paused(&name, false).await?))
}

pub async fn queue_stats(Path(name): Path<String>) -> Result<Json<QueueStats>, ApiError> {
    Ok(Json(QueueRepository::stats(&name).await?))
}

/// One page of the jobs in `state` on a queue.
pub async fn queue_jobs(
    path: Result<Path<(String, JobState, u64, u64)>, PathRejection>,
) -> Result<Json<JobPage>, ApiError> {
    let Path((name, state, start, limit)) = path?;

    QueueRepository::counts_for(&name).await?;
    Ok(Json(JobRepository::in_queue(&name, state, start, limit).await?))
}
