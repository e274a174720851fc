//! Persistence collaborator boundaries.
//!
//! The execution core treats storage as synchronous request/response
//! traits: load one workflow's records, insert/update execution rows.
//! The in-memory implementations back the test suites and small
//! deployments; database-backed implementations live outside the core.

use crate::connection::Connection;
use crate::definition::WorkflowDefinition;
use crate::execution::Execution;
use crate::node::NodeRecord;
use async_trait::async_trait;
use loomflow_core::{ExecutionId, WorkflowId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

/// Errors from storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The requested entity does not exist.
    NotFound { what: String },
    /// The backing store failed.
    Backend { message: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { what } => write!(f, "not found: {what}"),
            Self::Backend { message } => write!(f, "store backend error: {message}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Loads one workflow's persisted records.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Loads the workflow definition.
    async fn load_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowDefinition, StoreError>;

    /// Loads all node records for the workflow.
    async fn load_nodes(&self, workflow_id: WorkflowId) -> Result<Vec<NodeRecord>, StoreError>;

    /// Loads all connection records for the workflow.
    async fn load_connections(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<Connection>, StoreError>;
}

/// Persists execution rows.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Inserts a newly-created execution.
    async fn insert(&self, execution: &Execution) -> Result<(), StoreError>;

    /// Updates an existing execution.
    async fn update(&self, execution: &Execution) -> Result<(), StoreError>;

    /// Loads an execution by ID.
    async fn get(&self, execution_id: ExecutionId) -> Result<Execution, StoreError>;
}

struct StoredWorkflow {
    definition: WorkflowDefinition,
    nodes: Vec<NodeRecord>,
    connections: Vec<Connection>,
}

/// In-memory workflow store.
#[derive(Default)]
pub struct InMemoryWorkflowStore {
    entries: Mutex<HashMap<WorkflowId, StoredWorkflow>>,
}

impl InMemoryWorkflowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a workflow with its nodes and connections.
    pub fn insert(
        &self,
        definition: WorkflowDefinition,
        nodes: Vec<NodeRecord>,
        connections: Vec<Connection>,
    ) {
        self.entries.lock().unwrap().insert(
            definition.id,
            StoredWorkflow {
                definition,
                nodes,
                connections,
            },
        );
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn load_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<WorkflowDefinition, StoreError> {
        self.entries
            .lock()
            .unwrap()
            .get(&workflow_id)
            .map(|stored| stored.definition.clone())
            .ok_or_else(|| StoreError::NotFound {
                what: format!("workflow {workflow_id}"),
            })
    }

    async fn load_nodes(&self, workflow_id: WorkflowId) -> Result<Vec<NodeRecord>, StoreError> {
        self.entries
            .lock()
            .unwrap()
            .get(&workflow_id)
            .map(|stored| stored.nodes.clone())
            .ok_or_else(|| StoreError::NotFound {
                what: format!("workflow {workflow_id}"),
            })
    }

    async fn load_connections(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<Connection>, StoreError> {
        self.entries
            .lock()
            .unwrap()
            .get(&workflow_id)
            .map(|stored| stored.connections.clone())
            .ok_or_else(|| StoreError::NotFound {
                what: format!("workflow {workflow_id}"),
            })
    }
}

/// In-memory execution store.
#[derive(Default)]
pub struct InMemoryExecutionStore {
    rows: Mutex<HashMap<ExecutionId, Execution>>,
}

impl InMemoryExecutionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all stored executions, for inspection in tests.
    #[must_use]
    pub fn all(&self) -> Vec<Execution> {
        self.rows.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl ExecutionStore for InMemoryExecutionStore {
    async fn insert(&self, execution: &Execution) -> Result<(), StoreError> {
        self.rows
            .lock()
            .unwrap()
            .insert(execution.id, execution.clone());
        Ok(())
    }

    async fn update(&self, execution: &Execution) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if !rows.contains_key(&execution.id) {
            return Err(StoreError::NotFound {
                what: format!("execution {}", execution.id),
            });
        }
        rows.insert(execution.id, execution.clone());
        Ok(())
    }

    async fn get(&self, execution_id: ExecutionId) -> Result<Execution, StoreError> {
        self.rows
            .lock()
            .unwrap()
            .get(&execution_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                what: format!("execution {execution_id}"),
            })
    }
}
