//! Error types for the language-model collaborator boundary.

use std::fmt;

/// Errors from language-model invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmError {
    /// The provider rejected or failed the request.
    Provider { message: String },
    /// The request was malformed before it reached the provider.
    InvalidRequest { reason: String },
    /// The provider rate-limited the request.
    RateLimited,
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider { message } => write!(f, "llm provider error: {message}"),
            Self::InvalidRequest { reason } => write!(f, "invalid llm request: {reason}"),
            Self::RateLimited => write!(f, "llm provider rate limited the request"),
        }
    }
}

impl std::error::Error for LlmError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display() {
        let err = LlmError::Provider {
            message: "model overloaded".to_string(),
        };
        assert!(err.to_string().contains("model overloaded"));
    }

    #[test]
    fn invalid_request_display() {
        let err = LlmError::InvalidRequest {
            reason: "empty prompt".to_string(),
        };
        assert!(err.to_string().contains("empty prompt"));
    }
}
