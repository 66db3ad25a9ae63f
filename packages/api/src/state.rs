//! Shared handler state.

use std::sync::Arc;

use db::SurrealJobStore;
use lens_core::GroupNode;

/// State handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub groups: Arc<GroupNode>,
    pub store: SurrealJobStore,
}

impl AppState {
    pub fn new(groups: GroupNode) -> Self {
        Self {
            groups: Arc::new(groups),
            store: SurrealJobStore,
        }
    }
}
