//! Core domain types and resolvers for the queue lens.
//!
//! This crate contains the pieces shared across all packages:
//! - Job, QueueCounts and QueueStats records as read from the job store
//! - The `JobStore` lookup trait
//! - Dependency graph resolution (roots, trees, safe cancel closures)
//! - Hierarchical queue groups (navigation trees, matching, complements)

mod error;
mod job;
mod queue;
mod store;

pub mod graph;
pub mod groups;

pub use error::{ResolveError, StoreError};
pub use graph::{CancelSet, DependencyGraph, DependencyNode};
pub use groups::{GroupNode, GroupPattern, NavContent, NavNode, Named};
pub use job::{Job, JobFailure, JobId, JobPage, JobState, Priority};
pub use queue::{QueueCounts, QueueStats};
pub use store::{JobStore, fetch_job};
