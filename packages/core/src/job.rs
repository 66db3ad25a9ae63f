//! Job domain types as exposed by the job store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Opaque job identifier.
///
/// The store decides the format; new ids are ULID strings so they sort
/// chronologically, but any string handed back by the store is accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a fresh job ID.
    pub fn generate() -> Self {
        Self(Ulid::new().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Priority level for job execution order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low = 0,
    #[default]
    Normal = 1,
    High = 2,
    Critical = 3,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
            Priority::Critical => write!(f, "critical"),
        }
    }
}

/// Where a job currently sits in its queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Ready to be picked up by a worker.
    #[default]
    Waiting,
    /// Claimed by a worker.
    Running,
    /// Delayed until a future time.
    Scheduled,
    /// Blocked on unfinished dependencies.
    Depends,
    Complete,
    Failed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Running => "running",
            JobState::Scheduled => "scheduled",
            JobState::Depends => "depends",
            JobState::Complete => "complete",
            JobState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job record as returned by the store.
///
/// `dependencies` and `dependents` are each other's transpose across the
/// whole store: if A lists B as a dependency, B lists A as a dependent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub jid: JobId,
    pub queue_name: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub state: JobState,
    /// Job payload as JSON.
    #[serde(default)]
    pub data: serde_json::Value,
    /// Jobs this job waits on.
    #[serde(default)]
    pub dependencies: Vec<JobId>,
    /// Jobs waiting on this job.
    #[serde(default)]
    pub dependents: Vec<JobId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Why the job last failed; cleared when it is moved back to a queue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<JobFailure>,
    pub created_at: DateTime<Utc>,
}

/// Failure details of a failed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobFailure {
    /// Failed jobs are listed and bulk-handled per group.
    pub group: String,
    pub message: String,
}

/// One page of a job listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobPage {
    /// Matching jobs across all pages.
    pub total: u64,
    pub jobs: Vec<Job>,
}

impl Job {
    /// Create a new waiting job with a generated id.
    pub fn new(queue_name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            jid: JobId::generate(),
            queue_name: queue_name.into(),
            priority: Priority::default(),
            state: JobState::Waiting,
            data,
            dependencies: Vec::new(),
            dependents: Vec::new(),
            tags: Vec::new(),
            failure: None,
            created_at: Utc::now(),
        }
    }

    /// Use a caller-chosen id instead of a generated one.
    pub fn with_jid(mut self, jid: impl Into<JobId>) -> Self {
        self.jid = jid.into();
        self
    }

    /// Set the priority for this job.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Declare the jobs this one waits on.
    pub fn with_dependencies(mut self, dependencies: Vec<JobId>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Add tags to this job.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Mark the job as failed in `group`.
    pub fn with_failure(mut self, group: impl Into<String>, message: impl Into<String>) -> Self {
        self.state = JobState::Failed;
        self.failure = Some(JobFailure {
            group: group.into(),
            message: message.into(),
        });
        self
    }

    /// A root job has nothing left to wait on.
    pub fn is_root(&self) -> bool {
        self.dependencies.is_empty()
    }
}
