//! Session Module
//!
//! Holds the backend auth token and a minimal user profile per signed-in
//! user. Sessions expire a fixed number of days after login and travel in a
//! strict same-site, HTTP-only cookie.

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ActionError, Result};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

// == User Profile ==
/// The backend sends ids as numbers or strings (UUIDs) and roles as names
/// or `{id, name}` objects; both are kept as text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, deserialize_with = "id_text", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "role_name", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Pharmacy or pharmaceutical company
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
}

fn id_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) if !s.is_empty() => Ok(Some(s)),
        other => Err(de::Error::custom(format!("unsupported user id {}", other))),
    }
}

fn role_name<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Object(map) => match map.get("name") {
            Some(Value::String(name)) => Ok(Some(name.clone())),
            _ => Err(de::Error::custom("role object has no name")),
        },
        other => Err(de::Error::custom(format!("unsupported role {}", other))),
    }
}

impl UserProfile {
    /// Directory name for this user's drafts. `None` when the backend gave
    /// no id.
    pub fn draft_owner(&self) -> Option<String> {
        self.id.as_ref().map(|id| format!("user-{}", id))
    }
}

// == Session ==
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    #[serde(skip_serializing)]
    pub token: String,
    pub user: UserProfile,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>, user: UserProfile, ttl: Duration) -> Self {
        let issued_at = Utc::now();
        Self {
            token: token.into(),
            user,
            issued_at,
            expires_at: issued_at
                .checked_add_signed(ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Builds a session from the data of a successful login response.
    ///
    /// The token is read from `token` or `access_token`; the profile from
    /// `user` when present, otherwise from the data object itself.
    pub fn from_login(data: &Value, ttl: Duration) -> Result<Self> {
        let token = data
            .get("token")
            .or_else(|| data.get("access_token"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ActionError::application("Login response carried no token"))?;

        let profile = data.get("user").unwrap_or(data);
        let user = UserProfile::deserialize(profile).map_err(|e| {
            warn!("Unreadable user profile in login response: {}", e);
            ActionError::application("Login response carried an unreadable user profile")
        })?;

        Ok(Self::new(token, user, ttl))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Seconds left before expiry, for the cookie `Max-Age`.
    pub fn max_age_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }
}

// == Session Store ==
/// Shared map of live sessions keyed by token.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: Session) {
        debug!(user = %session.user.name, "Session opened");
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session);
    }

    /// Returns the session for `token` if it exists and has not expired.
    pub async fn get(&self, token: &str) -> Option<Session> {
        self.sessions
            .read()
            .await
            .get(token)
            .filter(|session| !session.is_expired(Utc::now()))
            .cloned()
    }

    pub async fn remove(&self, token: &str) -> Option<Session> {
        self.sessions.write().await.remove(token)
    }

    /// Drops expired sessions. Returns the count removed.
    pub async fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(now));
        let removed = before - sessions.len();
        if removed > 0 {
            info!("Removed {} expired sessions", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

// == Cookies ==
/// `Set-Cookie` value opening a session.
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// `Set-Cookie` value expiring the session cookie.
pub fn clear_cookie() -> String {
    session_cookie("", 0)
}

/// Session token from the `token` cookie, or else an `Authorization: Bearer`
/// header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string());

    from_cookie
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::to_string)
        })
        .filter(|token| !token.is_empty())
}
