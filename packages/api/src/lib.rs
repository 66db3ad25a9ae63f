//! HTTP API for the queue lens.
//!
//! This crate exposes the group tree, queue counts and job dependency views
//! as JSON over axum, plus the configuration the server is started with.

mod config;
mod error;
mod router;
mod state;

pub mod handlers;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
