//! Group tree handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use db::repositories::QueueRepository;
use lens_core::groups::{build_nav_tree, complement, match_group};
use lens_core::{GroupNode, NavContent, NavNode, QueueCounts};

use crate::{ApiError, AppState};

/// Path segment that selects queues claimed by no group.
pub const UNGROUPED: &str = "$";

/// The configured group tree.
pub async fn list_groups(State(state): State<AppState>) -> Json<GroupNode> {
    Json(state.groups.as_ref().clone())
}

/// Navigation tree for the configured groups, without the synthetic root.
pub async fn nav_tree(State(state): State<AppState>) -> Json<Vec<NavNode>> {
    let root = build_nav_tree("Groups", &state.groups);
    let children = match root.content {
        NavContent::Children(children) => children,
        NavContent::Data(_) => Vec::new(),
    };
    Json(children)
}

/// Queue counts for the queues selected by `pattern`.
///
/// `$` selects every queue that no leaf of the group tree matches.
pub async fn group_queues(
    State(state): State<AppState>,
    Path(pattern): Path<String>,
) -> Result<Json<Vec<QueueCounts>>, ApiError> {
    let queues = QueueRepository::counts().await?;

    let selected = if pattern == UNGROUPED {
        complement(queues, &state.groups)
    } else {
        match_group(queues, &pattern)?
    };

    tracing::debug!("Pattern {:?} selected {} queues", pattern, selected.len());
    Ok(Json(selected))
}
