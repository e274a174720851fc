//! Error types for the integration crate.
//!
//! - `EmailError`: failures from the email collaborator
//! - `HttpError`: failures from the outbound HTTP collaborator

use serde_json::Value as JsonValue;
use std::fmt;

/// Errors from email operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// No active email account is configured for the user.
    NoActiveAccount,
    /// The mail provider rejected or failed the operation.
    Provider { message: String },
}

impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoActiveAccount => write!(f, "no active email integration found"),
            Self::Provider { message } => write!(f, "email provider error: {message}"),
        }
    }
}

impl std::error::Error for EmailError {}

/// A failed outbound HTTP call.
///
/// Carries whatever the remote side returned, if anything: the workflow
/// engine surfaces these fields as the node's error-shaped result rather
/// than aborting the branch.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpError {
    /// Human-readable description of the failure.
    pub message: String,
    /// HTTP status code, if a response was received.
    pub status: Option<u16>,
    /// Response body, if a response was received.
    pub body: Option<JsonValue>,
}

impl HttpError {
    /// Creates a transport-level error with no response data.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
            body: None,
        }
    }

    /// Creates an error for a response with a failure status.
    #[must_use]
    pub fn status(status: u16, body: JsonValue) -> Self {
        Self {
            message: format!("request failed with status {status}"),
            status: Some(status),
            body: Some(body),
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for HttpError {}
