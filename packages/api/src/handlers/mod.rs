//! Request handlers, grouped by resource.

pub mod groups;
pub mod jobs;
pub mod queues;
pub mod tags;
