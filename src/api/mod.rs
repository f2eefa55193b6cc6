//! API Module
//!
//! HTTP handlers and routing for the admin gateway.
//!
//! # Endpoints
//! - `POST /actions/:operation` - Run a catalog operation
//! - `POST /auth/login`, `POST /auth/logout`, `GET /auth/session` - Sessions
//! - `GET|PUT|DELETE /drafts/:name` - Draft form state
//! - `GET /stats` - Query cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
