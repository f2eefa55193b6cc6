//! Draft Store Module
//!
//! Named draft form state (for example the lines of an invoice being
//! composed) persisted as JSON files and restored on the next visit. Drafts
//! are kept per owner under `<dir>/<owner>/<name>.json`.

use std::path::{Path, PathBuf};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::client::ActionResult;

static DRAFT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("draft name pattern is valid"));

// == Draft Error ==
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Invalid draft name: {0}")]
    InvalidName(String),
}

impl IntoResponse for DraftError {
    fn into_response(self) -> Response {
        let status = match &self {
            DraftError::InvalidName(_) => StatusCode::BAD_REQUEST,
            DraftError::Serde(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DraftError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body: ActionResult<Value> = ActionResult::error(self.to_string());
        (status, Json(body)).into_response()
    }
}

// == Draft Store ==
#[derive(Debug, Clone)]
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn owner_dir(&self, owner: &str) -> Result<PathBuf, DraftError> {
        if !DRAFT_NAME.is_match(owner) {
            return Err(DraftError::InvalidName(owner.to_string()));
        }
        Ok(self.dir.join(owner))
    }

    fn path_for(&self, owner: &str, name: &str) -> Result<PathBuf, DraftError> {
        if !DRAFT_NAME.is_match(name) {
            return Err(DraftError::InvalidName(name.to_string()));
        }
        Ok(self.owner_dir(owner)?.join(format!("{}.json", name)))
    }

    /// Returns the saved draft, or `None` if there is none.
    pub async fn load(&self, owner: &str, name: &str) -> Result<Option<Value>, DraftError> {
        let path = self.path_for(owner, name)?;
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    pub async fn save(&self, owner: &str, name: &str, state: &Value) -> Result<(), DraftError> {
        let path = self.path_for(owner, name)?;
        tokio::fs::create_dir_all(self.owner_dir(owner)?).await?;
        let contents = serde_json::to_string_pretty(state)?;
        tokio::fs::write(&path, contents).await?;
        debug!(owner, draft = name, "Draft saved");
        Ok(())
    }

    /// Removes a draft. Returns false when there was nothing to remove.
    pub async fn delete(&self, owner: &str, name: &str) -> Result<bool, DraftError> {
        let path = self.path_for(owner, name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store(tag: &str) -> DraftStore {
        let dir = std::env::temp_dir().join(format!(
            "pharma_admin_drafts_{}_{}",
            tag,
            std::process::id()
        ));
        DraftStore::new(dir)
    }

    #[tokio::test]
    async fn test_save_load_delete() {
        let store = temp_store("roundtrip");
        let draft = json!({"items": [{"product_id": 1, "quantity": 2}]});

        assert_eq!(store.load("7", "invoice").await.unwrap(), None);
        store.save("7", "invoice", &draft).await.unwrap();
        assert_eq!(store.load("7", "invoice").await.unwrap(), Some(draft));
        assert_eq!(store.load("8", "invoice").await.unwrap(), None);
        assert!(store.delete("7", "invoice").await.unwrap());
        assert!(!store.delete("7", "invoice").await.unwrap());

        let _ = tokio::fs::remove_dir_all(store.dir()).await;
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let store = temp_store("names");
        for name in ["../etc", "a/b", "", "a.json"] {
            assert!(matches!(
                store.load("7", name).await,
                Err(DraftError::InvalidName(_))
            ));
            assert!(matches!(
                store.load(name, "invoice").await,
                Err(DraftError::InvalidName(_))
            ));
        }
    }
}
