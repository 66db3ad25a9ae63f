//! Repository implementations for database operations.

mod job_repo;
mod queue_repo;

pub use job_repo::{JobRepository, UNKNOWN_FAILURE_GROUP};
pub use queue_repo::QueueRepository;
