//! `JobStore` backed by the job repository.

use lens_core::{Job, JobId, JobStore, StoreError};

use crate::repositories::JobRepository;

/// Resolver-facing view of the SurrealDB job table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurrealJobStore;

impl JobStore for SurrealJobStore {
    async fn get_jobs(&self, ids: &[JobId]) -> Result<Vec<Job>, StoreError> {
        Ok(JobRepository::get_many(ids).await?)
    }
}
