//! Execution event emission.
//!
//! Status changes are fire-and-forget broadcasts written to an explicit
//! outbound sink. Whatever needs live state (dashboards, logs) consumes
//! the sink's transport; the core never knows who is listening. The
//! in-memory sink backs tests; the NATS sink is the production
//! transport.

use crate::execution::{ExecutionStatus, TriggerSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loomflow_core::{ExecutionId, TriggerId, WorkflowId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

/// Events emitted by the tracker and the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    /// An execution entered the running state.
    ExecutionStarted {
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        trigger: TriggerSource,
        timestamp: DateTime<Utc>,
    },
    /// An execution reached a terminal status.
    ExecutionFinished {
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        status: ExecutionStatus,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// An autonomous trigger fired and produced an execution.
    TriggerFired {
        trigger_id: TriggerId,
        workflow_id: WorkflowId,
        execution_id: ExecutionId,
        timestamp: DateTime<Utc>,
    },
    /// An autonomous trigger failed to dispatch.
    TriggerFailed {
        trigger_id: TriggerId,
        workflow_id: WorkflowId,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl ExecutionEvent {
    /// A short tag naming the event kind, used as the subject suffix.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ExecutionStarted { .. } => "execution_started",
            Self::ExecutionFinished { .. } => "execution_finished",
            Self::TriggerFired { .. } => "trigger_fired",
            Self::TriggerFailed { .. } => "trigger_failed",
        }
    }

    /// Returns the event's timestamp.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::ExecutionStarted { timestamp, .. }
            | Self::ExecutionFinished { timestamp, .. }
            | Self::TriggerFired { timestamp, .. }
            | Self::TriggerFailed { timestamp, .. } => *timestamp,
        }
    }
}

/// Errors from event publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSinkError {
    /// The event could not be published.
    PublishFailed { message: String },
}

impl fmt::Display for EventSinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PublishFailed { message } => write!(f, "event publish failed: {message}"),
        }
    }
}

impl std::error::Error for EventSinkError {}

/// Trait for the outbound event channel.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publishes one event.
    ///
    /// # Errors
    ///
    /// Returns an error if publication fails; callers log and continue,
    /// since events are advisory.
    async fn publish(&self, event: ExecutionEvent) -> Result<(), EventSinkError>;
}

/// In-memory sink that records events for inspection.
#[derive(Default)]
pub struct InMemoryEventSink {
    events: Mutex<Vec<ExecutionEvent>>,
}

impl InMemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events, in publication order.
    #[must_use]
    pub fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn publish(&self, event: ExecutionEvent) -> Result<(), EventSinkError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Subject prefix for NATS-published events.
const SUBJECT_PREFIX: &str = "workflow.events";

/// NATS-backed event sink.
///
/// Events are published as JSON to `workflow.events.<kind>`.
pub struct NatsEventSink {
    client: async_nats::Client,
    subject_prefix: String,
}

impl NatsEventSink {
    /// Connects to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, EventSinkError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| EventSinkError::PublishFailed {
                message: format!("nats connect failed: {e}"),
            })?;
        Ok(Self::with_client(client))
    }

    /// Wraps an existing NATS client.
    #[must_use]
    pub fn with_client(client: async_nats::Client) -> Self {
        Self {
            client,
            subject_prefix: SUBJECT_PREFIX.to_string(),
        }
    }

    /// Overrides the subject prefix.
    #[must_use]
    pub fn with_subject_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.subject_prefix = prefix.into();
        self
    }
}

#[async_trait]
impl EventSink for NatsEventSink {
    async fn publish(&self, event: ExecutionEvent) -> Result<(), EventSinkError> {
        let subject = format!("{}.{}", self.subject_prefix, event.kind());
        let payload = serde_json::to_vec(&event).map_err(|e| EventSinkError::PublishFailed {
            message: e.to_string(),
        })?;

        self.client
            .publish(subject, payload.into())
            .await
            .map_err(|e| EventSinkError::PublishFailed {
                message: e.to_string(),
            })
    }
}
