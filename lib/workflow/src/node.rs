//! Workflow node records.
//!
//! A node is one typed processing step in a workflow. Each node has:
//! - A stable ID, unique within its workflow
//! - A type tag, resolved against the handler registry at dispatch time
//! - A free-form configuration object
//! - An editor payload (`data`) that doubles as a configuration fallback
//! - A canvas position, irrelevant to execution

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use ulid::Ulid;

/// A unique identifier for a node within a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Ulid);

impl NodeId {
    /// Creates a new random node ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    /// Creates a node ID from a ULID.
    #[must_use]
    pub const fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// Returns the underlying ULID.
    #[must_use]
    pub const fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node_{}", self.0)
    }
}

/// Canvas coordinates assigned by the graphical editor.
///
/// Stored with the node so the editor can round-trip it; execution
/// ignores it entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A persisted workflow node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Unique identifier for this node within the workflow.
    pub id: NodeId,
    /// Type tag, matched against the handler registry.
    pub node_type: String,
    /// Free-form configuration for the node's handler.
    pub config: JsonValue,
    /// Editor payload; consulted as a fallback for configuration keys.
    pub data: JsonValue,
    /// Canvas position.
    pub position: Position,
}

impl NodeRecord {
    /// Creates a node of the given type with empty configuration.
    #[must_use]
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            node_type: node_type.into(),
            config: JsonValue::Object(Default::default()),
            data: JsonValue::Object(Default::default()),
            position: Position::default(),
        }
    }

    /// Creates a node with a specific ID.
    #[must_use]
    pub fn with_id(id: NodeId, node_type: impl Into<String>) -> Self {
        Self {
            id,
            node_type: node_type.into(),
            config: JsonValue::Object(Default::default()),
            data: JsonValue::Object(Default::default()),
            position: Position::default(),
        }
    }

    /// Sets the configuration object.
    #[must_use]
    pub fn with_config(mut self, config: JsonValue) -> Self {
        self.config = config;
        self
    }

    /// Sets the editor payload.
    #[must_use]
    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = data;
        self
    }

    /// Looks up a configuration key, falling back to the editor payload.
    #[must_use]
    pub fn setting(&self, key: &str) -> Option<&JsonValue> {
        self.config
            .get(key)
            .filter(|v| !v.is_null())
            .or_else(|| self.data.get(key).filter(|v| !v.is_null()))
    }

    /// Looks up a configuration key as a string slice.
    #[must_use]
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.setting(key).and_then(JsonValue::as_str)
    }

    /// Looks up a configuration key as an f64.
    #[must_use]
    pub fn setting_f64(&self, key: &str) -> Option<f64> {
        self.setting(key).and_then(JsonValue::as_f64)
    }
}
