//! Queue summaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{JobState, Priority};

/// Per-state job counts for one queue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueCounts {
    /// Queue name, the only identity a queue has.
    pub name: String,
    pub waiting: u64,
    pub running: u64,
    pub scheduled: u64,
    pub depends: u64,
    pub failed: u64,
    /// Paused queues hand out no work.
    pub paused: bool,
}

impl QueueCounts {
    /// Empty counts for a queue.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add `count` jobs in `state` to the tally.
    ///
    /// Completed jobs are not part of a queue's live counts.
    pub fn record(&mut self, state: JobState, count: u64) {
        match state {
            JobState::Waiting => self.waiting += count,
            JobState::Running => self.running += count,
            JobState::Scheduled => self.scheduled += count,
            JobState::Depends => self.depends += count,
            JobState::Failed => self.failed += count,
            JobState::Complete => {}
        }
    }
}

/// Totals for one queue, including finished jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueStats {
    pub name: String,
    pub total: u64,
    pub complete: u64,
    pub failed: u64,
    /// Unfinished jobs per priority.
    pub pending_by_priority: BTreeMap<Priority, u64>,
}

impl QueueStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add `count` jobs with the given priority and state.
    pub fn record(&mut self, priority: Priority, state: JobState, count: u64) {
        self.total += count;
        match state {
            JobState::Complete => self.complete += count,
            JobState::Failed => self.failed += count,
            _ => *self.pending_by_priority.entry(priority).or_default() += count,
        }
    }
}
