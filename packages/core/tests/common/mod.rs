#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use lens_core::{Job, JobId, JobStore, StoreError};
use serde_json::json;

/// In-memory job store that keeps dependency edges transposed.
#[derive(Default)]
pub struct MemoryStore {
    jobs: HashMap<JobId, Job>,
    lookups: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job with no edges to the given queue.
    pub fn job(mut self, jid: &str, queue: &str) -> Self {
        self.jobs
            .entry(JobId::from(jid))
            .or_insert_with(|| Job::new(queue, json!({})).with_jid(jid));
        self
    }

    /// Record that `dependent` waits on `dependency`, creating either job
    /// in queue `default` when missing.
    pub fn depends(self, dependent: &str, dependency: &str) -> Self {
        let mut store = self.job(dependent, "default").job(dependency, "default");
        store.push_dependency(dependent, dependency);
        store.push_dependent(dependency, dependent);
        store
    }

    /// Add only the forward edge, leaving `dependency` unresolvable.
    pub fn dangling(mut self, dependent: &str, dependency: &str) -> Self {
        self = self.job(dependent, "default");
        self.push_dependency(dependent, dependency);
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn get(&self, jid: &str) -> &Job {
        &self.jobs[&JobId::from(jid)]
    }

    fn push_dependency(&mut self, dependent: &str, dependency: &str) {
        if let Some(job) = self.jobs.get_mut(&JobId::from(dependent)) {
            job.dependencies.push(JobId::from(dependency));
        }
    }

    fn push_dependent(&mut self, dependency: &str, dependent: &str) {
        if let Some(job) = self.jobs.get_mut(&JobId::from(dependency)) {
            job.dependents.push(JobId::from(dependent));
        }
    }
}

impl JobStore for MemoryStore {
    async fn get_jobs(&self, ids: &[JobId]) -> Result<Vec<Job>, StoreError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(ids
            .iter()
            .filter_map(|id| self.jobs.get(id).cloned())
            .collect())
    }
}

/// Store whose backend is always down.
pub struct UnreachableStore;

impl JobStore for UnreachableStore {
    async fn get_jobs(&self, _ids: &[JobId]) -> Result<Vec<Job>, StoreError> {
        Err(StoreError::new("connection refused"))
    }
}

pub fn ids(values: &[&str]) -> Vec<JobId> {
    values.iter().map(|v| JobId::from(*v)).collect()
}
