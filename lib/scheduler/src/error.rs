//! Error types for the scheduler crate.
//!
//! - `TriggerError`: errors from trigger storage
//! - `SchedulerError`: arming and dispatch failures

use loomflow_core::TriggerId;
use std::fmt;

/// Errors from trigger storage operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerError {
    /// Trigger not found.
    NotFound { id: TriggerId },
    /// Storage operation failed.
    StorageFailed { reason: String },
}

impl fmt::Display for TriggerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "trigger not found: {id}"),
            Self::StorageFailed { reason } => write!(f, "trigger storage failed: {reason}"),
        }
    }
}

impl std::error::Error for TriggerError {}

/// Errors from scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The cron expression could not be parsed.
    InvalidCron { expression: String, reason: String },
    /// A fire could not start its execution.
    DispatchFailed { trigger_id: TriggerId, reason: String },
    /// Trigger storage failed.
    Trigger(TriggerError),
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCron { expression, reason } => {
                write!(f, "invalid cron expression '{expression}': {reason}")
            }
            Self::DispatchFailed { trigger_id, reason } => {
                write!(f, "trigger {trigger_id} dispatch failed: {reason}")
            }
            Self::Trigger(e) => write!(f, "trigger store error: {e}"),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<TriggerError> for SchedulerError {
    fn from(e: TriggerError) -> Self {
        Self::Trigger(e)
    }
}
