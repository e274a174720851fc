//! Error types for the workflow crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `GraphError`: structural problems found while building the execution graph
//! - `ExpressionError`: parse/eval failures inside the expression evaluator
//! - `HandlerError`: failures from node handlers, captured as failure markers
//! - `TrackerError`: invalid execution lifecycle transitions
//! - `RuntimeError`: high-level run orchestration failures

use crate::node::NodeId;
use crate::store::StoreError;
use loomflow_core::{ExecutionId, WorkflowId};
use std::fmt;

/// Structural problems found while building an execution graph.
///
/// Any of these aborts the execution before a single node runs; there is
/// nothing to partially execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A connection references a node absent from the node set.
    DanglingConnection { node_id: NodeId },
    /// Two node records share the same ID.
    DuplicateNode { node_id: NodeId },
    /// The graph contains a cycle.
    CycleDetected,
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DanglingConnection { node_id } => {
                write!(f, "connection references unknown node: {node_id}")
            }
            Self::DuplicateNode { node_id } => {
                write!(f, "duplicate node id in workflow: {node_id}")
            }
            Self::CycleDetected => write!(f, "workflow graph contains a cycle"),
        }
    }
}

impl std::error::Error for GraphError {}

/// Failures inside the expression evaluator.
///
/// Conditions swallow these to `false`; transforms surface them as
/// handler failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    /// The expression could not be parsed.
    Parse { reason: String },
    /// The expression parsed but could not be evaluated.
    Eval { reason: String },
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse { reason } => write!(f, "expression parse error: {reason}"),
            Self::Eval { reason } => write!(f, "expression eval error: {reason}"),
        }
    }
}

impl std::error::Error for ExpressionError {}

/// Failures from node handlers.
///
/// The executor records these as failure markers in the results map and
/// keeps traversing; they never abort sibling branches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// No handler is registered for the node's type tag.
    UnknownNodeType { node_type: String },
    /// The node configuration is missing or malformed.
    InvalidConfig { reason: String },
    /// A required input value was provided neither by config nor context.
    MissingInput { field: String },
    /// An external collaborator failed.
    Collaborator { service: String, message: String },
    /// The handler exceeded its time budget.
    Timeout,
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownNodeType { node_type } => {
                write!(f, "unknown node type: {node_type}")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid node config: {reason}"),
            Self::MissingInput { field } => write!(f, "missing required input: {field}"),
            Self::Collaborator { service, message } => {
                write!(f, "{service} collaborator failed: {message}")
            }
            Self::Timeout => write!(f, "handler timed out"),
        }
    }
}

impl std::error::Error for HandlerError {}

impl From<ExpressionError> for HandlerError {
    fn from(e: ExpressionError) -> Self {
        Self::InvalidConfig {
            reason: e.to_string(),
        }
    }
}

/// Invalid execution lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// No execution with the given ID exists.
    NotFound { execution_id: ExecutionId },
    /// The execution already reached a terminal status.
    AlreadyFinished { execution_id: ExecutionId },
    /// The execution store failed.
    Store(StoreError),
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { execution_id } => {
                write!(f, "execution not found: {execution_id}")
            }
            Self::AlreadyFinished { execution_id } => {
                write!(f, "execution already finished: {execution_id}")
            }
            Self::Store(e) => write!(f, "execution store error: {e}"),
        }
    }
}

impl std::error::Error for TrackerError {}

impl From<StoreError> for TrackerError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// High-level run orchestration failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The target workflow does not exist.
    WorkflowNotFound { workflow_id: WorkflowId },
    /// The target workflow is disabled.
    WorkflowDisabled { workflow_id: WorkflowId },
    /// The execution graph could not be built.
    Graph(GraphError),
    /// The execution lifecycle could not be recorded.
    Tracker(TrackerError),
    /// The workflow store failed.
    Store(StoreError),
    /// The runtime is at its concurrent-execution cap.
    Saturated,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkflowNotFound { workflow_id } => {
                write!(f, "workflow not found: {workflow_id}")
            }
            Self::WorkflowDisabled { workflow_id } => {
                write!(f, "workflow is disabled: {workflow_id}")
            }
            Self::Graph(e) => write!(f, "graph build failed: {e}"),
            Self::Tracker(e) => write!(f, "execution tracking failed: {e}"),
            Self::Store(e) => write!(f, "workflow store error: {e}"),
            Self::Saturated => write!(f, "runtime is at its concurrent execution limit"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<GraphError> for RuntimeError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<TrackerError> for RuntimeError {
    fn from(e: TrackerError) -> Self {
        Self::Tracker(e)
    }
}

impl From<StoreError> for RuntimeError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_error_display() {
        let node_id = NodeId::new();
        let err = GraphError::DanglingConnection { node_id };
        assert!(err.to_string().contains("unknown node"));
        assert!(GraphError::CycleDetected.to_string().contains("cycle"));
    }

    #[test]
    fn handler_error_display() {
        let err = HandlerError::UnknownNodeType {
            node_type: "webhook".to_string(),
        };
        assert!(err.to_string().contains("unknown node type: webhook"));

        let err = HandlerError::Collaborator {
            service: "llm".to_string(),
            message: "overloaded".to_string(),
        };
        assert!(err.to_string().contains("llm collaborator failed"));
    }

    #[test]
    fn expression_error_converts_to_handler_error() {
        let err = ExpressionError::Parse {
            reason: "unexpected token".to_string(),
        };
        let handler_err: HandlerError = err.into();
        assert!(handler_err.to_string().contains("unexpected token"));
    }

    #[test]
    fn tracker_error_display() {
        let execution_id = ExecutionId::new();
        let err = TrackerError::AlreadyFinished { execution_id };
        assert!(err.to_string().contains("already finished"));
    }

    #[test]
    fn runtime_error_from_graph_error() {
        let err: RuntimeError = GraphError::CycleDetected.into();
        assert!(err.to_string().contains("cycle"));
    }
}
