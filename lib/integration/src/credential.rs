//! Opaque credential passthrough.
//!
//! The execution core never inspects credential contents; it carries them
//! from storage to whichever connector needs them. The secret is kept as
//! raw JSON so provider-specific shapes (OAuth token sets, app passwords,
//! API keys) survive untouched.

use loomflow_core::{CredentialId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// A stored credential for an external account.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Unique identifier for this credential.
    pub id: CredentialId,
    /// The user this credential belongs to.
    pub owner: UserId,
    /// Provider-specific kind tag (e.g., "email", "oauth2").
    pub kind: String,
    /// The opaque secret material.
    pub secret: JsonValue,
}

impl Credential {
    /// Creates a new credential.
    #[must_use]
    pub fn new(owner: UserId, kind: impl Into<String>, secret: JsonValue) -> Self {
        Self {
            id: CredentialId::new(),
            owner,
            kind: kind.into(),
            secret,
        }
    }
}

// Secret material must never leak through debug/log output.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("kind", &self.kind)
            .field("secret", &"<redacted>")
            .finish()
    }
}
