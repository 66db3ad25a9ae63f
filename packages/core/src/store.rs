//! The read interface the resolvers need from a job store.

use std::future::Future;

use crate::{Job, JobId, ResolveError, StoreError};

/// Lookup side of a job store.
///
/// Implementations return the records for the ids they know and silently
/// omit the rest; callers decide whether a missing id is an error.
pub trait JobStore: Send + Sync {
    /// Fetch job records, in request order, skipping unknown ids.
    fn get_jobs(&self, ids: &[JobId])
    -> impl Future<Output = Result<Vec<Job>, StoreError>> + Send;
}

/// Resolve a single id, treating an empty result as `NotFound`.
pub async fn fetch_job<S: JobStore>(store: &S, jid: &JobId) -> Result<Job, ResolveError> {
    let ids = [jid.clone()];
    store
        .get_jobs(&ids)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ResolveError::NotFound(jid.clone()))
}
