//! Workflow execution core for the loomflow platform.
//!
//! This crate turns a persisted node/connection description into a
//! runnable dependency graph and executes it:
//!
//! - **Records**: node, connection, and workflow definition types
//! - **Graph**: per-execution adjacency structure with build-time
//!   validation (dangling references, duplicates, cycles)
//! - **Handlers**: one handler per node type tag behind an explicit
//!   registry; template and condition micro-languages for data wiring
//! - **Executor**: memoized predecessor-first traversal with inline
//!   failure markers
//! - **Lifecycle**: execution records, the state tracker, and the
//!   outbound event sink
//! - **Runtime**: the facade that ties stores, tracker, and executor
//!   together with admission control

pub mod condition;
pub mod connection;
pub mod definition;
pub mod error;
pub mod event;
pub mod execution;
pub mod executor;
pub mod graph;
pub mod handler;
pub mod handlers;
pub mod node;
pub mod runtime;
pub mod store;
pub mod template;
pub mod tracker;

pub use connection::Connection;
pub use definition::WorkflowDefinition;
pub use error::{ExpressionError, GraphError, HandlerError, RuntimeError, TrackerError};
pub use event::{EventSink, ExecutionEvent, InMemoryEventSink, NatsEventSink};
pub use execution::{Execution, ExecutionStatus, NodeOutcome, ResultsMap, TriggerSource};
pub use executor::{DagExecutor, ExecutorConfig};
pub use graph::ExecutionGraph;
pub use handler::{HandlerRegistry, NodeHandler};
pub use handlers::builtin_registry;
pub use node::{NodeId, NodeRecord, Position};
pub use runtime::{RuntimeConfig, WorkflowRuntime};
pub use store::{
    ExecutionStore, InMemoryExecutionStore, InMemoryWorkflowStore, StoreError, WorkflowStore,
};
pub use tracker::{ExecutionTracker, RunOutcome};
