//! Axum router configuration.
//!
//! ```text
//! /api
//! ├── /groups/*   - configured group tree and queue selection by pattern
//! ├── /queues/*   - per-queue job counts and stats, paged listings, pause/unpause
//! ├── /jobs/*     - job lookup, dependency trees, cancel and edits, failed/completed listings
//! └── /tags/*     - tags in use and tagged jobs
//! ```

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;
use crate::handlers::{groups, jobs, queues, tags};

/// Build the complete router, mounted under `/api`.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(groups_router())
        .merge(queues_router())
        .merge(jobs_router())
        .merge(tags_router());

    Router::new().nest("/api", api).with_state(state)
}

fn groups_router() -> Router<AppState> {
    Router::new()
        .route("/groups", get(groups::list_groups))
        .route("/groups/nav_tree", get(groups::nav_tree))
        .route("/groups/queues/{pattern}", get(groups::group_queues))
}

fn queues_router() -> Router<AppState> {
    Router::new()
        .route("/queues", get(queues::list_queues))
        .route("/queues/{name}", get(queues::get_queue))
        .route("/queues/{name}/pause", post(queues::pause_queue))
        .route("/queues/{name}/unpause", post(queues::unpause_queue))
        .route("/queues/{name}/stats", get(queues::queue_stats))
        .route(
            "/queues/{name}/{state}/{start}/{limit}",
            get(queues::queue_jobs),
        )
}

fn jobs_router() -> Router<AppState> {
    Router::new()
        .route("/jobs/cancel", post(jobs::cancel_jobs))
        .route("/jobs/failed", get(jobs::failed_groups))
        .route("/jobs/failed/{group}/{start}/{limit}", get(jobs::failed_jobs))
        .route("/jobs/failed/{group}/cancel", post(jobs::cancel_failed))
        .route("/jobs/failed/{group}/retry", post(jobs::retry_failed))
        .route("/jobs/completed/{start}/{limit}", get(jobs::completed_jobs))
        .route("/jobs/{jid}", get(jobs::get_job))
        .route("/jobs/{jid}/cancel", post(jobs::cancel_job))
        .route("/jobs/{jid}/cancel_subtree", post(jobs::cancel_subtree))
        .route("/jobs/{jid}/trees", get(jobs::dependency_trees))
        .route("/jobs/{jid}/retry", post(jobs::retry_job))
        .route("/jobs/{jid}/move", post(jobs::move_job))
        .route("/jobs/{jid}/priority", post(jobs::set_priority))
        .route("/jobs/{jid}/depend", post(jobs::depend))
        .route("/jobs/{jid}/undepend", post(jobs::undepend))
        .route("/jobs/{jid}/tag", post(jobs::tag_job))
        .route("/jobs/{jid}/untag", post(jobs::untag_job))
}

fn tags_router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(tags::list_tags))
        .route("/tags/{tag}/{start}/{limit}", get(tags::tagged_jobs))
}
