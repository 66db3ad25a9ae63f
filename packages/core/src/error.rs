//! Resolver error types.

use thiserror::Error;

use crate::JobId;

/// Opaque failure reported by a job store backend.
///
/// Resolvers never retry; whatever the backend reports is handed upward.
#[derive(Debug, Error)]
#[error("job store failure: {0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors raised by the dependency and group resolvers.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Job not found: {0}")]
    NotFound(JobId),
    #[error("Invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Cyclic dependency through job {0}")]
    CyclicDependency(JobId),
    #[error("Invalid group `{path}`: {reason}")]
    InvalidGroup { path: String, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}
