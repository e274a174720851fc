//! Execution state tracking.
//!
//! The tracker owns the execution lifecycle: `start` creates a running
//! record, `finish` transitions it exactly once to `Completed` or
//! `Failed`. Re-finishing a finished execution is rejected as a
//! programming error, never silently overwritten. Each transition is
//! persisted through the execution store and broadcast through the
//! event sink.

use crate::error::TrackerError;
use crate::event::{EventSink, ExecutionEvent};
use crate::execution::{Execution, TriggerSource};
use crate::store::{ExecutionStore, StoreError};
use chrono::Utc;
use loomflow_core::{ExecutionId, WorkflowId};
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// The terminal outcome of a run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Every node ran clean; the output is the full results map.
    Completed { output: JsonValue },
    /// The run failed; partial results are kept when available.
    Failed {
        error: String,
        output: Option<JsonValue>,
    },
}

/// Records execution lifecycles and broadcasts status changes.
pub struct ExecutionTracker {
    store: Arc<dyn ExecutionStore>,
    sink: Arc<dyn EventSink>,
}

impl ExecutionTracker {
    /// Creates a tracker over the given store and event sink.
    pub fn new(store: Arc<dyn ExecutionStore>, sink: Arc<dyn EventSink>) -> Self {
        Self { store, sink }
    }

    /// Creates and persists a running execution.
    ///
    /// # Errors
    ///
    /// Returns an error if the execution row cannot be inserted.
    pub async fn start(
        &self,
        workflow_id: WorkflowId,
        trigger: TriggerSource,
        input: JsonValue,
    ) -> Result<Execution, TrackerError> {
        let execution = Execution::new(workflow_id, trigger, input);
        self.store.insert(&execution).await?;

        self.emit(ExecutionEvent::ExecutionStarted {
            execution_id: execution.id,
            workflow_id,
            trigger,
            timestamp: Utc::now(),
        })
        .await;

        Ok(execution)
    }

    /// Transitions a running execution to its terminal status.
    ///
    /// # Errors
    ///
    /// Returns an error if the execution does not exist, has already
    /// finished, or cannot be persisted.
    pub async fn finish(
        &self,
        execution_id: ExecutionId,
        outcome: RunOutcome,
    ) -> Result<Execution, TrackerError> {
        let mut execution = self.store.get(execution_id).await.map_err(|e| match e {
            StoreError::NotFound { .. } => TrackerError::NotFound { execution_id },
            other => TrackerError::Store(other),
        })?;

        if execution.status.is_terminal() {
            return Err(TrackerError::AlreadyFinished { execution_id });
        }

        match outcome {
            RunOutcome::Completed { output } => execution.complete(output),
            RunOutcome::Failed { error, output } => execution.fail(error, output),
        }

        self.store.update(&execution).await?;

        self.emit(ExecutionEvent::ExecutionFinished {
            execution_id,
            workflow_id: execution.workflow_id,
            status: execution.status,
            error: execution.error.clone(),
            timestamp: Utc::now(),
        })
        .await;

        Ok(execution)
    }

    // Events are advisory: a sink failure must not fail the run.
    async fn emit(&self, event: ExecutionEvent) {
        if let Err(e) = self.sink.publish(event).await {
            tracing::warn!(error = %e, "failed to publish execution event");
        }
    }
}
