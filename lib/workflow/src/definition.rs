//! Workflow definition records.
//!
//! A workflow definition carries the user-facing metadata and the global
//! variable bag. The editor owns these records; the execution core reads
//! them and never writes back.

use chrono::{DateTime, Utc};
use loomflow_core::{UserId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A persisted workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Unique identifier for this workflow.
    pub id: WorkflowId,
    /// The user who owns this workflow.
    pub owner: UserId,
    /// Human-readable name.
    pub name: String,
    /// Description of what this workflow does.
    pub description: Option<String>,
    /// Whether this workflow may be executed.
    pub enabled: bool,
    /// Global variables, exposed to every node under the `vars` key.
    pub variables: JsonValue,
    /// When this workflow was created.
    pub created_at: DateTime<Utc>,
    /// When this workflow was last updated.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Creates an enabled workflow with no variables.
    #[must_use]
    pub fn new(owner: UserId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowId::new(),
            owner,
            name: name.into(),
            description: None,
            enabled: true,
            variables: JsonValue::Object(Default::default()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the global variable bag.
    #[must_use]
    pub fn with_variables(mut self, variables: JsonValue) -> Self {
        self.variables = variables;
        self
    }

    /// Disables the workflow.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.updated_at = Utc::now();
    }

    /// Enables the workflow.
    pub fn enable(&mut self) {
        self.enabled = true;
        self.updated_at = Utc::now();
    }

    /// Returns true if the variable bag has at least one entry.
    #[must_use]
    pub fn has_variables(&self) -> bool {
        self.variables
            .as_object()
            .is_some_and(|map| !map.is_empty())
    }
}
