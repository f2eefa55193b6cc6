//! Error types for the admin gateway
//!
//! Provides the action error taxonomy using thiserror. Errors never cross the
//! gateway boundary as panics or raw exceptions; they are turned into an
//! `ActionResult::Error` envelope with a matching status code.

use axum::http::StatusCode;
use thiserror::Error;

use crate::client::ActionResult;
use crate::messages::{Locale, Message};
use crate::schema::{FieldErrors, ValidationErrors};

// == Action Error Enum ==
/// Unified error type for one action call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionError {
    /// One or more parameters failed schema validation
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// No valid session for an operation that requires one
    #[error("Unauthorized: {0}")]
    Authorization(String),

    /// Network failure, timeout or unparseable response body
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend rejected the request with a business-rule error
    #[error("{message}")]
    Application {
        message: String,
        field_errors: Option<FieldErrors>,
    },

    /// Operation name not present in the catalog
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),
}

impl ActionError {
    /// Builds an application error without field details.
    pub fn application(message: impl Into<String>) -> Self {
        ActionError::Application {
            message: message.into(),
            field_errors: None,
        }
    }

    // == Retry Policy ==
    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ActionError::Transport(_))
    }

    // == Status Code ==
    /// HTTP status the gateway answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ActionError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ActionError::Authorization(_) => StatusCode::UNAUTHORIZED,
            ActionError::Transport(_) => StatusCode::BAD_GATEWAY,
            ActionError::Application { .. } => StatusCode::BAD_REQUEST,
            ActionError::UnknownOperation(_) => StatusCode::NOT_FOUND,
        }
    }

    // == Envelope ==
    /// Converts the error into the uniform error envelope.
    ///
    /// Validation and application errors keep their field errors. Transport
    /// errors are reported with a generic localized message; the detail is only
    /// logged.
    pub fn into_result<T>(self, locale: Locale) -> ActionResult<T> {
        match self {
            ActionError::Validation(errors) => ActionResult::Error {
                message: locale.text(Message::ValidationFailed).to_string(),
                field_errors: Some(errors.into_fields()),
            },
            ActionError::Authorization(message) => ActionResult::Error {
                message: if message.is_empty() {
                    locale.text(Message::Unauthorized).to_string()
                } else {
                    message
                },
                field_errors: None,
            },
            ActionError::Transport(_) => ActionResult::Error {
                message: locale.text(Message::NetworkFailure).to_string(),
                field_errors: None,
            },
            ActionError::Application {
                message,
                field_errors,
            } => ActionResult::Error {
                message,
                field_errors,
            },
            ActionError::UnknownOperation(name) => ActionResult::Error {
                message: format!("{}: {}", locale.text(Message::UnknownOperation), name),
                field_errors: None,
            },
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for actions.
pub type Result<T> = std::result::Result<T, ActionError>;
