//! Email collaborator boundary.
//!
//! The workflow engine drives exactly three operations over a mail
//! account: read recent messages, search by query, and send. Connectors
//! own the protocol details and the credentials; results come back as
//! provider-shaped JSON that flows into the results map untouched.

use crate::error::EmailError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Mutex;

/// An outbound message to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    /// Recipient address.
    pub recipient: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

impl OutgoingEmail {
    /// Creates a new outgoing message.
    #[must_use]
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

/// Trait for email connectors.
///
/// Implementations are constructed with the account's opaque credentials;
/// the engine never sees them.
#[async_trait]
pub trait EmailConnector: Send + Sync {
    /// Reads recent messages from the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    async fn read(&self) -> Result<JsonValue, EmailError>;

    /// Searches the account for messages matching the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    async fn search(&self, query: &str) -> Result<JsonValue, EmailError>;

    /// Sends a message through the account.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    async fn send(&self, message: &OutgoingEmail) -> Result<JsonValue, EmailError>;
}

/// An in-memory connector double that records sent messages.
pub struct MockEmailConnector {
    /// Messages "sent" through this connector, in order.
    pub sent: Mutex<Vec<OutgoingEmail>>,
    /// The value returned by `read`.
    pub inbox: JsonValue,
    /// If set, every operation fails with this error.
    pub fail_with: Option<EmailError>,
}

impl MockEmailConnector {
    /// Creates a connector with an empty inbox.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            inbox: JsonValue::Array(Vec::new()),
            fail_with: None,
        }
    }

    /// Creates a connector whose `read` returns the given inbox.
    #[must_use]
    pub fn with_inbox(inbox: JsonValue) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            inbox,
            fail_with: None,
        }
    }

    /// Creates a connector where every operation fails.
    #[must_use]
    pub fn failing(error: EmailError) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            inbox: JsonValue::Null,
            fail_with: Some(error),
        }
    }
}

impl Default for MockEmailConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailConnector for MockEmailConnector {
    async fn read(&self) -> Result<JsonValue, EmailError> {
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(self.inbox.clone()),
        }
    }

    async fn search(&self, query: &str) -> Result<JsonValue, EmailError> {
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => Ok(serde_json::json!({"query": query, "messages": []})),
        }
    }

    async fn send(&self, message: &OutgoingEmail) -> Result<JsonValue, EmailError> {
        match &self.fail_with {
            Some(e) => Err(e.clone()),
            None => {
                self.sent.lock().unwrap().push(message.clone());
                Ok(serde_json::json!({"sent": true, "recipient": message.recipient}))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_connector_records_sent_messages() {
        let connector = MockEmailConnector::new();
        let message = OutgoingEmail::new("a@example.com", "Hi", "Body");

        let result = connector.send(&message).await.expect("send");
        assert_eq!(result["sent"], true);
        assert_eq!(connector.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mock_connector_returns_inbox() {
        let connector =
            MockEmailConnector::with_inbox(serde_json::json!([{"subject": "Welcome"}]));

        let inbox = connector.read().await.expect("read");
        assert_eq!(inbox[0]["subject"], "Welcome");
    }

    #[tokio::test]
    async fn mock_connector_fails_on_demand() {
        let connector = MockEmailConnector::failing(EmailError::NoActiveAccount);

        let result = connector.read().await;
        assert_eq!(result.unwrap_err(), EmailError::NoActiveAccount);
    }

    #[test]
    fn outgoing_email_serde_roundtrip() {
        let message = OutgoingEmail::new("a@example.com", "Subject", "Body");
        let json = serde_json::to_string(&message).expect("serialize");
        let parsed: OutgoingEmail = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(message, parsed);
    }
}
