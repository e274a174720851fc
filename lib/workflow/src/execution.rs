//! Execution records and the per-run results map.
//!
//! One `Execution` row exists per run attempt. It is created in the
//! `Running` state and mutated exactly once when the run completes or
//! fails; concurrent runs of the same workflow are fully independent
//! records. The `ResultsMap` is the run's in-memory memo of every node's
//! value or failure marker; it grows monotonically during traversal and
//! is discarded (after being snapshotted into the execution's output)
//! when the run ends.

use crate::node::NodeId;
use chrono::{DateTime, Utc};
use loomflow_core::{ExecutionId, TriggerId, UserId, WorkflowId};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

/// What started an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerSource {
    /// A user requested the run.
    Manual { user: UserId },
    /// An autonomous trigger fired.
    Autonomous { trigger: TriggerId },
}

/// The lifecycle status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The run is in flight.
    Running,
    /// Every node ran without a failure marker.
    Completed,
    /// The graph failed to build, or at least one node failed.
    Failed,
}

impl ExecutionStatus {
    /// Returns true if this is a terminal status.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// The value a node produced, or its failure marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum NodeOutcome {
    /// The handler returned a value.
    Success { value: JsonValue },
    /// The handler failed; the error travels downstream inline.
    Failure { error: String },
}

impl NodeOutcome {
    /// Returns true for failure markers.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// The value downstream nodes see in their input context.
    ///
    /// Failures travel as `{"error": message}` so a dependent node
    /// receives the marker instead of the traversal halting.
    #[must_use]
    pub fn as_input_value(&self) -> JsonValue {
        match self {
            Self::Success { value } => value.clone(),
            Self::Failure { error } => serde_json::json!({"error": error}),
        }
    }
}

/// Per-execution memo of each node's outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultsMap {
    entries: HashMap<NodeId, NodeOutcome>,
}

impl ResultsMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a node's outcome.
    pub fn insert(&mut self, node_id: NodeId, outcome: NodeOutcome) {
        self.entries.insert(node_id, outcome);
    }

    /// Returns a node's outcome, if it has run.
    #[must_use]
    pub fn get(&self, node_id: NodeId) -> Option<&NodeOutcome> {
        self.entries.get(&node_id)
    }

    /// Returns true if the node has an entry.
    #[must_use]
    pub fn contains(&self, node_id: NodeId) -> bool {
        self.entries.contains_key(&node_id)
    }

    /// Number of nodes recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no node has run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over recorded outcomes.
    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &NodeOutcome)> {
        self.entries.iter()
    }

    /// Returns the IDs of nodes that failed.
    #[must_use]
    pub fn failed_nodes(&self) -> Vec<NodeId> {
        self.entries
            .iter()
            .filter(|(_, outcome)| outcome.is_failure())
            .map(|(node_id, _)| *node_id)
            .collect()
    }

    /// Returns true if any node failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.entries.values().any(NodeOutcome::is_failure)
    }

    /// Snapshots the map as a JSON value for the execution's output.
    #[must_use]
    pub fn to_value(&self) -> JsonValue {
        serde_json::to_value(self).unwrap_or(JsonValue::Null)
    }
}

/// One run attempt of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Unique identifier for this run.
    pub id: ExecutionId,
    /// The workflow being executed.
    pub workflow_id: WorkflowId,
    /// What started the run.
    pub trigger: TriggerSource,
    /// Current status.
    pub status: ExecutionStatus,
    /// The payload the run started with.
    pub input: JsonValue,
    /// The results map snapshot; present once the run finishes, including
    /// partial results when the run failed.
    pub output: Option<JsonValue>,
    /// Error text if the run failed.
    pub error: Option<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Execution {
    /// Creates a running execution.
    #[must_use]
    pub fn new(workflow_id: WorkflowId, trigger: TriggerSource, input: JsonValue) -> Self {
        Self {
            id: ExecutionId::new(),
            workflow_id,
            trigger,
            status: ExecutionStatus::Running,
            input,
            output: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Marks the run as completed.
    pub fn complete(&mut self, output: JsonValue) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.output = Some(output);
    }

    /// Marks the run as failed, keeping whatever partial output exists.
    pub fn fail(&mut self, error: String, output: Option<JsonValue>) {
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error);
        self.output = output;
    }

    /// Returns the run duration, if it has finished.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }
}
