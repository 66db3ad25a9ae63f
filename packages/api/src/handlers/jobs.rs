//! Job handlers: lookup, dependency views and job mutations.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use chrono::{DateTime, Utc};
use db::repositories::JobRepository;
use lens_core::{
    DependencyGraph, DependencyNode, Job, JobFailure, JobId, JobPage, JobState, JobStore,
    Priority, ResolveError, fetch_job,
};
use serde::Serialize;

use crate::{ApiError, AppState};

/// A job with its direct neighbours expanded to full records.
#[derive(Debug, Clone, Serialize)]
pub struct JobView {
    pub jid: JobId,
    pub queue_name: String,
    pub priority: Priority,
    pub state: JobState,
    pub data: serde_json::Value,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
    pub dependencies: Vec<Job>,
    pub dependents: Vec<Job>,
}

impl JobView {
    fn new(job: Job, dependencies: Vec<Job>, dependents: Vec<Job>) -> Self {
        Self {
            jid: job.jid,
            queue_name: job.queue_name,
            priority: job.priority,
            state: job.state,
            data: job.data,
            tags: job.tags,
            failure: job.failure,
            created_at: job.created_at,
            dependencies,
            dependents,
        }
    }
}

/// Upper bound on jobs handled by one bulk failed-group request.
const FAILED_BATCH: u64 = 1000;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    let Json(value) = payload?;
    Ok(value)
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(jid): Path<JobId>,
) -> Result<Json<JobView>, ApiError> {
    let job = fetch_job(&state.store, &jid).await?;
    let dependencies = state
        .store
        .get_jobs(&job.dependencies)
        .await
        .map_err(ResolveError::from)?;
    let dependents = state
        .store
        .get_jobs(&job.dependents)
        .await
        .map_err(ResolveError::from)?;

    Ok(Json(JobView::new(job, dependencies, dependents)))
}

/// Cancel a single job. Fails if another job still depends on it.
pub async fn cancel_job(Path(jid): Path<JobId>) -> Result<Json<Vec<JobId>>, ApiError> {
    JobRepository::get(&jid).await?;
    Ok(Json(JobRepository::cancel(&[jid]).await?))
}

/// Cancel every existing job in the request body; unknown ids are skipped.
pub async fn cancel_jobs(
    payload: Result<Json<Vec<JobId>>, JsonRejection>,
) -> Result<Json<Vec<JobId>>, ApiError> {
    let jids = body(payload)?;
    Ok(Json(JobRepository::cancel(&jids).await?))
}

/// The set of jobs that can be cancelled together with `jid`.
///
/// Nothing is cancelled; the caller submits the list to `/jobs/cancel`.
pub async fn cancel_subtree(
    State(state): State<AppState>,
    Path(jid): Path<JobId>,
) -> Result<Json<Vec<JobId>>, ApiError> {
    let graph = DependencyGraph::new(&state.store);
    Ok(Json(graph.safe_cancel_closure(&jid).await?))
}

/// Dependency trees rooted at the root jobs of `jid`.
///
/// Trees consisting of a single job carry no dependency information and are
/// left out.
pub async fn dependency_trees(
    State(state): State<AppState>,
    Path(jid): Path<JobId>,
) -> Result<Json<Vec<DependencyNode>>, ApiError> {
    let graph = DependencyGraph::new(&state.store);
    let trees = graph
        .dependency_tree(&jid)
        .await?
        .into_iter()
        .filter(|tree| !tree.is_leaf())
        .collect();
    Ok(Json(trees))
}

/// Put a job back on its own queue.
pub async fn retry_job(Path(jid): Path<JobId>) -> Result<Json<Job>, ApiError> {
    let job = JobRepository::get(&jid).await?;
    Ok(Json(JobRepository::move_to(&jid, &job.queue_name).await?))
}

pub async fn move_job(
    Path(jid): Path<JobId>,
    payload: Result<Json<String>, JsonRejection>,
) -> Result<Json<Job>, ApiError> {
    let queue = body(payload)?;
    if queue.is_empty() {
        return Err(ApiError::BadRequest("Queue name must not be empty".to_string()));
    }
    Ok(Json(JobRepository::move_to(&jid, &queue).await?))
}

pub async fn set_priority(
    Path(jid): Path<JobId>,
    payload: Result<Json<Priority>, JsonRejection>,
) -> Result<Json<Job>, ApiError> {
    let priority = body(payload)?;
    Ok(Json(JobRepository::set_priority(&jid, priority).await?))
}

pub async fn depend(
    Path(jid): Path<JobId>,
    payload: Result<Json<Vec<JobId>>, JsonRejection>,
) -> Result<Json<Job>, ApiError> {
    let dependencies = body(payload)?;
    Ok(Json(JobRepository::depend(&jid, &dependencies).await?))
}

/// Drop the listed dependencies, or all of them for an empty list.
pub async fn undepend(
    Path(jid): Path<JobId>,
    payload: Result<Json<Vec<JobId>>, JsonRejection>,
) -> Result<Json<Job>, ApiError> {
    let dependencies = body(payload)?;
    Ok(Json(JobRepository::undepend(&jid, &dependencies).await?))
}

pub async fn tag_job(
    Path(jid): Path<JobId>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Result<Json<Vec<String>>, ApiError> {
    let tags = body(payload)?;
    Ok(Json(JobRepository::tag(&jid, &tags).await?))
}

pub async fn untag_job(
    Path(jid): Path<JobId>,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> Result<Json<Vec<String>>, ApiError> {
    let tags = body(payload)?;
    Ok(Json(JobRepository::untag(&jid, &tags).await?))
}

/// Failed job counts per failure group.
pub async fn failed_groups() -> Result<Json<BTreeMap<String, u64>>, ApiError> {
    Ok(Json(JobRepository::failed_groups().await?))
}

pub async fn failed_jobs(
    path: Result<Path<(String, u64, u64)>, PathRejection>,
) -> Result<Json<JobPage>, ApiError> {
    let Path((group, start, limit)) = path?;
    Ok(Json(JobRepository::failed(&group, start, limit).await?))
}

/// Cancel the failed jobs of a group in one request.
pub async fn cancel_failed(Path(group): Path<String>) -> Result<Json<Vec<JobId>>, ApiError> {
    let failed = JobRepository::failed(&group, 0, FAILED_BATCH).await?;
    let jids: Vec<JobId> = failed.jobs.into_iter().map(|job| job.jid).collect();

    Ok(Json(JobRepository::cancel(&jids).await?))
}

/// Put the failed jobs of a group back on their queues.
pub async fn retry_failed(Path(group): Path<String>) -> Result<Json<Vec<Job>>, ApiError> {
    let failed = JobRepository::failed(&group, 0, FAILED_BATCH).await?;

    let mut retried = Vec::with_capacity(failed.jobs.len());
    for job in failed.jobs {
        retried.push(JobRepository::move_to(&job.jid, &job.queue_name).await?);
    }

    tracing::info!(group = %group, count = retried.len(), "Retried failed jobs");
    Ok(Json(retried))
}

pub async fn completed_jobs(
    path: Result<Path<(u64, u64)>, PathRejection>,
) -> Result<Json<JobPage>, ApiError> {
    let Path((start, limit)) = path?;
    Ok(Json(JobRepository::completed(start, limit).await?))
}
