//! Connection records for workflow graphs.
//!
//! A connection is a directed data link from a source node's output
//! handle to a target node's input handle. Handles default to
//! `"default"` when the editor does not name them.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

/// The handle name used when the editor does not specify one.
pub const DEFAULT_HANDLE: &str = "default";

/// A directed link between two nodes in the same workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// The source node.
    pub source: NodeId,
    /// The output handle on the source node.
    pub source_handle: String,
    /// The target node.
    pub target: NodeId,
    /// The input handle on the target node.
    pub target_handle: String,
}

impl Connection {
    /// Creates a connection with explicit handles.
    #[must_use]
    pub fn new(
        source: NodeId,
        source_handle: impl Into<String>,
        target: NodeId,
        target_handle: impl Into<String>,
    ) -> Self {
        Self {
            source,
            source_handle: source_handle.into(),
            target,
            target_handle: target_handle.into(),
        }
    }

    /// Creates a connection using the default handle on both ends.
    #[must_use]
    pub fn with_default_handles(source: NodeId, target: NodeId) -> Self {
        Self::new(source, DEFAULT_HANDLE, target, DEFAULT_HANDLE)
    }
}
