//! Node handler contract and registry.
//!
//! Each node type tag maps to one handler. Handlers are pure with respect
//! to the engine: they consume the node's aggregated input context plus
//! its configuration and produce a JSON result or a typed failure. The
//! registry is constructed explicitly and passed into the executor, so
//! tests can swap in doubles per node type; there is no global table.

use crate::error::HandlerError;
use crate::node::NodeRecord;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Trait for node handlers.
///
/// The context is the node's aggregated input (keyed by target handle),
/// or the run's initial input for a node with no incoming edges.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    /// Executes the node and returns its value.
    ///
    /// # Errors
    ///
    /// Returns an error on failure; the executor records it as a failure
    /// marker and keeps traversing.
    async fn handle(
        &self,
        context: &JsonValue,
        node: &NodeRecord,
    ) -> Result<JsonValue, HandlerError>;
}

/// An explicit, constructed mapping from type tags to handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn NodeHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registers a handler for a type tag, replacing any previous one.
    pub fn register(&mut self, node_type: impl Into<String>, handler: Arc<dyn NodeHandler>) {
        self.handlers.insert(node_type.into(), handler);
    }

    /// Returns the handler for a type tag.
    #[must_use]
    pub fn get(&self, node_type: &str) -> Option<&Arc<dyn NodeHandler>> {
        self.handlers.get(node_type)
    }

    /// Returns true if a handler is registered for the type tag.
    #[must_use]
    pub fn contains(&self, node_type: &str) -> bool {
        self.handlers.contains_key(node_type)
    }

    /// Returns the registered type tags.
    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
