//! The autonomous trigger scheduler.
//!
//! On start, every active trigger is armed as its own recurring tokio
//! task driven by its cron schedule. Each fire dispatches an execution
//! through the workflow runtime on a spawned task, so a slow run never
//! blocks the next tick of this or any other trigger. A trigger whose
//! workflow is missing or disabled fails fast: the failure is logged
//! and surfaced through the event sink, and the schedule stays armed.

use crate::error::SchedulerError;
use crate::schedule::CronSchedule;
use crate::trigger::{AutonomousTrigger, TriggerStore};
use chrono::Utc;
use loomflow_core::ExecutionId;
use loomflow_workflow::event::{EventSink, ExecutionEvent};
use loomflow_workflow::execution::TriggerSource;
use loomflow_workflow::runtime::WorkflowRuntime;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Arms and fires autonomous triggers.
#[derive(Clone)]
pub struct Scheduler {
    triggers: Arc<dyn TriggerStore>,
    runtime: Arc<WorkflowRuntime>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
}

impl Scheduler {
    /// Creates a scheduler over the given collaborators.
    pub fn new(
        triggers: Arc<dyn TriggerStore>,
        runtime: Arc<WorkflowRuntime>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            triggers,
            runtime,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    /// Loads all active triggers and arms one recurring task per entry.
    ///
    /// Triggers with an unparsable cron expression are skipped with a
    /// warning; the rest still arm. Returns the number armed.
    ///
    /// # Errors
    ///
    /// Returns an error if the trigger store cannot be read.
    pub async fn start(&self) -> Result<usize, SchedulerError> {
        let triggers = self.triggers.list_active().await?;
        let mut armed = 0;

        for trigger in triggers {
            match CronSchedule::parse(&trigger.cron) {
                Ok(schedule) => {
                    info!(trigger = %trigger.id, schedule = %trigger.cron, "trigger armed");
                    let scheduler = self.clone();
                    tokio::spawn(async move { scheduler.run_trigger(trigger, schedule).await });
                    armed += 1;
                }
                Err(e) => {
                    warn!(
                        trigger = %trigger.id,
                        schedule = %trigger.cron,
                        error = %e,
                        "invalid cron expression, skipping trigger"
                    );
                }
            }
        }

        info!(count = armed, "scheduler started");
        Ok(armed)
    }

    /// Stops all armed triggers.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn run_trigger(&self, trigger: AutonomousTrigger, schedule: CronSchedule) {
        loop {
            let now = Utc::now();
            let Some(fire_at) = schedule.next_after(now) else {
                warn!(trigger = %trigger.id, "schedule has no upcoming fire time");
                return;
            };
            let delay = (fire_at - now).to_std().unwrap_or(Duration::from_secs(1));

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    // Each fire is an independent dispatch; the next tick
                    // is computed immediately.
                    let scheduler = self.clone();
                    let trigger = trigger.clone();
                    tokio::spawn(async move {
                        let _ = scheduler.fire(&trigger).await;
                    });
                }
                _ = self.cancel.cancelled() => {
                    info!(trigger = %trigger.id, "trigger disarmed");
                    return;
                }
            }
        }
    }

    /// Fires one trigger: stamps last-fired, runs the workflow, and
    /// emits the trigger-fired or trigger-failed event.
    ///
    /// # Errors
    ///
    /// Returns an error if the execution could not be dispatched.
    pub async fn fire(&self, trigger: &AutonomousTrigger) -> Result<ExecutionId, SchedulerError> {
        if let Err(e) = self.triggers.record_fired(trigger.id, Utc::now()).await {
            warn!(trigger = %trigger.id, error = %e, "failed to stamp last-fired time");
        }

        let source = TriggerSource::Autonomous {
            trigger: trigger.id,
        };
        let input = JsonValue::Object(Default::default());

        match self.runtime.run(trigger.workflow_id, source, input).await {
            Ok(execution) => {
                self.emit(ExecutionEvent::TriggerFired {
                    trigger_id: trigger.id,
                    workflow_id: trigger.workflow_id,
                    execution_id: execution.id,
                    timestamp: Utc::now(),
                })
                .await;
                Ok(execution.id)
            }
            Err(e) => {
                error!(
                    trigger = %trigger.id,
                    workflow = %trigger.workflow_id,
                    error = %e,
                    "trigger dispatch failed"
                );
                self.emit(ExecutionEvent::TriggerFailed {
                    trigger_id: trigger.id,
                    workflow_id: trigger.workflow_id,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                })
                .await;
                Err(SchedulerError::DispatchFailed {
                    trigger_id: trigger.id,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn emit(&self, event: ExecutionEvent) {
        if let Err(e) = self.sink.publish(event).await {
            warn!(error = %e, "failed to publish scheduler event");
        }
    }
}
