//! Pharma Admin - gateway for pharmacy and pharmaceutical-company admin tools
//!
//! Validates and authorizes actions, maps them onto the remote REST API,
//! normalizes responses into a uniform envelope and caches reads with
//! single-flight fetching and mutation-driven invalidation.

pub mod actions;
pub mod api;
pub mod client;
pub mod config;
pub mod drafts;
pub mod error;
pub mod messages;
pub mod models;
pub mod operations;
pub mod query;
pub mod schema;
pub mod session;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{ActionError, Result};
pub use tasks::spawn_maintenance_task;
