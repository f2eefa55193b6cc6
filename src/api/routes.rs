//! API Routes
//!
//! Configures the Axum router with all gateway endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    action_handler, delete_draft_handler, get_draft_handler, health_handler, login_handler,
    logout_handler, put_draft_handler, session_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `POST /actions/:operation` - Run a catalog operation
/// - `POST /auth/login` - Sign in and receive the session cookie
/// - `POST /auth/logout` - Sign out and drop the session's cached reads
/// - `GET /auth/session` - Current user
/// - `GET|PUT|DELETE /drafts/:name` - Draft form state
/// - `GET /stats` - Query cache statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin (configurable for production)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/actions/:operation", post(action_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/session", get(session_handler))
        .route(
            "/drafts/:name",
            get(get_draft_handler)
                .put(put_draft_handler)
                .delete(delete_draft_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
