//! API Handlers
//!
//! HTTP request handlers for each gateway endpoint. Action endpoints always
//! answer with an `ActionResult` envelope; the status code mirrors the
//! error kind.

use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::actions::Actions;
use crate::client::{ActionResult, ApiClient};
use crate::config::Config;
use crate::drafts::{DraftError, DraftStore};
use crate::error::{ActionError, Result};
use crate::messages::Locale;
use crate::models::{ActionQuery, HealthResponse, SessionResponse, StatsResponse};
use crate::operations::Operation;
use crate::query::QueryClient;
use crate::schema::{ValidationErrors, ROOT_PATH};
use crate::session::{clear_cookie, session_cookie, token_from_headers, Session, SessionStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub actions: Actions,
    pub sessions: SessionStore,
    pub drafts: DraftStore,
    pub session_ttl: chrono::Duration,
}

impl AppState {
    pub fn new(actions: Actions, sessions: SessionStore, drafts: DraftStore) -> Self {
        Self {
            actions,
            sessions,
            drafts,
            session_ttl: chrono::Duration::days(7),
        }
    }

    /// Creates a new AppState from configuration.
    ///
    /// Builds the backend client and an empty query cache.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = ApiClient::from_config(config)?;
        let queries = QueryClient::from_config(config);
        let actions = Actions::new(api, queries, config.locale);
        Ok(Self {
            session_ttl: config.session_ttl(),
            ..Self::new(
                actions,
                SessionStore::new(),
                DraftStore::new(config.drafts_dir.clone()),
            )
        })
    }

    pub fn queries(&self) -> &QueryClient {
        self.actions.queries()
    }

    fn locale(&self) -> Locale {
        self.actions.locale()
    }

    /// Live session of the caller, if any.
    async fn session(&self, headers: &HeaderMap) -> Option<Session> {
        let token = token_from_headers(headers)?;
        self.sessions.get(&token).await
    }

    fn error_response(&self, err: ActionError) -> Response {
        (err.status_code(), Json(err.into_result::<Value>(self.locale()))).into_response()
    }
}

/// Empty body → null; anything else must be JSON.
fn parse_body(body: &Bytes) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|_| {
        let mut errors = ValidationErrors::new();
        errors.add(ROOT_PATH, "Expected a JSON object");
        ActionError::Validation(errors)
    })
}

// == Actions ==
/// Handler for POST /actions/:operation
///
/// Runs one catalog operation. `?refetch=true` forces a fresh read.
pub async fn action_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<ActionQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let operation = match Operation::from_str(&name) {
        Ok(operation) => operation,
        Err(err) => return state.error_response(err),
    };
    let params = match parse_body(&body) {
        Ok(params) => params,
        Err(err) => return state.error_response(err),
    };

    match operation {
        Operation::Login => login(&state, params).await,
        Operation::Logout => logout(&state, &headers).await,
        _ => {
            let session = state.session(&headers).await;
            match state
                .actions
                .execute(operation, params, session.as_ref(), query.refetch)
                .await
            {
                Ok(envelope) => Json(ActionResult::from(envelope)).into_response(),
                Err(err) => state.error_response(err),
            }
        }
    }
}

// == Auth ==
/// Handler for POST /auth/login
pub async fn login_handler(State(state): State<AppState>, body: Bytes) -> Response {
    match parse_body(&body) {
        Ok(params) => login(&state, params).await,
        Err(err) => state.error_response(err),
    }
}

async fn login(state: &AppState, params: Value) -> Response {
    let outcome = state
        .actions
        .execute(Operation::Login, params, None, false)
        .await
        .and_then(|envelope| Session::from_login(&envelope.data, state.session_ttl));

    match outcome {
        Ok(session) => {
            let cookie = session_cookie(&session.token, session.max_age_secs());
            let body = ActionResult::success(SessionResponse::from(&session));
            info!(user = %session.user.name, "User signed in");
            state.sessions.insert(session).await;
            ([(header::SET_COOKIE, cookie)], Json(body)).into_response()
        }
        Err(err) => state.error_response(err),
    }
}

/// Handler for POST /auth/logout
///
/// Ends the backend session, forgets the local one, drops its cached reads
/// and expires the cookie. Succeeds even without a session.
pub async fn logout_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    logout(&state, &headers).await
}

async fn logout(state: &AppState, headers: &HeaderMap) -> Response {
    if let Some(session) = state.session(headers).await {
        if let Err(err) = state
            .actions
            .execute(Operation::Logout, Value::Null, Some(&session), false)
            .await
        {
            warn!("Backend logout failed: {}", err);
        }
        state.sessions.remove(&session.token).await;
        let cleared = state.queries().clear_scope(&session.token).await;
        info!(user = %session.user.name, cleared, "User signed out");
    }

    let body: ActionResult<Value> = ActionResult::success(Value::Null);
    ([(header::SET_COOKIE, clear_cookie())], Json(body)).into_response()
}

/// Handler for GET /auth/session
pub async fn session_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match state.session(&headers).await {
        Some(session) => Json(ActionResult::success(SessionResponse::from(&session))).into_response(),
        None => state.error_response(ActionError::Authorization(String::new())),
    }
}

// == Drafts ==
/// Draft owner for the caller, or the 401/403 response to send.
async fn draft_owner(state: &AppState, headers: &HeaderMap) -> std::result::Result<String, Response> {
    let session = state
        .session(headers)
        .await
        .ok_or_else(|| state.error_response(ActionError::Authorization(String::new())))?;
    session.user.draft_owner().ok_or_else(|| {
        warn!(user = %session.user.name, "Draft request from a profile without an id");
        let body: ActionResult<Value> =
            ActionResult::error("Drafts need a signed-in user with an id");
        (StatusCode::FORBIDDEN, Json(body)).into_response()
    })
}

/// Handler for GET /drafts/:name
pub async fn get_draft_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let owner = match draft_owner(&state, &headers).await {
        Ok(owner) => owner,
        Err(response) => return response,
    };
    match state.drafts.load(&owner, &name).await {
        Ok(Some(draft)) => Json(ActionResult::success(draft)).into_response(),
        Ok(None) => {
            let body: ActionResult<Value> = ActionResult::error(format!("No draft named {}", name));
            (StatusCode::NOT_FOUND, Json(body)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Handler for PUT /drafts/:name
pub async fn put_draft_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let owner = match draft_owner(&state, &headers).await {
        Ok(owner) => owner,
        Err(response) => return response,
    };
    let draft = match serde_json::from_slice::<Value>(&body) {
        Ok(draft) => draft,
        Err(e) => return DraftError::from(e).into_response(),
    };
    match state.drafts.save(&owner, &name, &draft).await {
        Ok(()) => Json(ActionResult::success(draft)).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Handler for DELETE /drafts/:name
pub async fn delete_draft_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let owner = match draft_owner(&state, &headers).await {
        Ok(owner) => owner,
        Err(response) => return response,
    };
    match state.drafts.delete(&owner, &name).await {
        Ok(deleted) => Json(ActionResult::success(json!({ "deleted": deleted }))).into_response(),
        Err(err) => err.into_response(),
    }
}

// == Service ==
/// Handler for GET /stats
///
/// Returns query cache statistics and the live session count.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.queries().stats().await;
    let sessions = state.sessions.len().await;
    Json(StatsResponse::new(stats, sessions))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
