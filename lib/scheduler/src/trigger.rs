//! Autonomous trigger records and storage.
//!
//! One trigger exists per autonomously-operating agent. The scheduler
//! stamps `last_fired_at` on every fire; disabling the owning agent
//! deactivates the trigger rather than deleting it, so its history
//! survives.

use crate::error::TriggerError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loomflow_core::{AgentId, TriggerId, UserId, WorkflowId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

/// A recurring-schedule entry for one autonomous agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutonomousTrigger {
    /// Unique identifier for this trigger.
    pub id: TriggerId,
    /// The agent this trigger belongs to.
    pub agent_id: AgentId,
    /// The workflow to execute on each fire.
    pub workflow_id: WorkflowId,
    /// The user who owns the agent.
    pub owner: UserId,
    /// 5-field cron expression.
    pub cron: String,
    /// Whether the scheduler should arm this trigger.
    pub active: bool,
    /// When the trigger last fired, if ever.
    pub last_fired_at: Option<DateTime<Utc>>,
    /// When this trigger was created.
    pub created_at: DateTime<Utc>,
    /// When this trigger was last updated.
    pub updated_at: DateTime<Utc>,
}

impl AutonomousTrigger {
    /// Creates an active trigger.
    #[must_use]
    pub fn new(
        agent_id: AgentId,
        workflow_id: WorkflowId,
        owner: UserId,
        cron: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TriggerId::new(),
            agent_id,
            workflow_id,
            owner,
            cron: cron.into(),
            active: true,
            last_fired_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Deactivates the trigger (the record is kept, not deleted).
    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }

    /// Stamps the last-fired time.
    pub fn record_fired(&mut self, when: DateTime<Utc>) {
        self.last_fired_at = Some(when);
        self.updated_at = when;
    }
}

/// Trait for trigger storage.
#[async_trait]
pub trait TriggerStore: Send + Sync {
    /// Returns all active triggers.
    async fn list_active(&self) -> Result<Vec<AutonomousTrigger>, TriggerError>;

    /// Returns a trigger by ID.
    async fn get(&self, id: TriggerId) -> Result<AutonomousTrigger, TriggerError>;

    /// Stamps a trigger's last-fired time.
    async fn record_fired(&self, id: TriggerId, when: DateTime<Utc>) -> Result<(), TriggerError>;

    /// Deactivates a trigger.
    async fn deactivate(&self, id: TriggerId) -> Result<(), TriggerError>;
}

/// In-memory trigger store.
#[derive(Default)]
pub struct InMemoryTriggerStore {
    triggers: Mutex<HashMap<TriggerId, AutonomousTrigger>>,
}

impl InMemoryTriggerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a trigger.
    pub fn insert(&self, trigger: AutonomousTrigger) {
        self.triggers.lock().unwrap().insert(trigger.id, trigger);
    }
}

#[async_trait]
impl TriggerStore for InMemoryTriggerStore {
    async fn list_active(&self) -> Result<Vec<AutonomousTrigger>, TriggerError> {
        Ok(self
            .triggers
            .lock()
            .unwrap()
            .values()
            .filter(|t| t.active)
            .cloned()
            .collect())
    }

    async fn get(&self, id: TriggerId) -> Result<AutonomousTrigger, TriggerError> {
        self.triggers
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(TriggerError::NotFound { id })
    }

    async fn record_fired(&self, id: TriggerId, when: DateTime<Utc>) -> Result<(), TriggerError> {
        let mut triggers = self.triggers.lock().unwrap();
        let trigger = triggers
            .get_mut(&id)
            .ok_or(TriggerError::NotFound { id })?;
        trigger.record_fired(when);
        Ok(())
    }

    async fn deactivate(&self, id: TriggerId) -> Result<(), TriggerError> {
        let mut triggers = self.triggers.lock().unwrap();
        let trigger = triggers
            .get_mut(&id)
            .ok_or(TriggerError::NotFound { id })?;
        trigger.deactivate();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger() -> AutonomousTrigger {
        AutonomousTrigger::new(
            AgentId::new(),
            WorkflowId::new(),
            UserId::new(),
            "0 7 * * *",
        )
    }

    #[test]
    fn new_trigger_is_active_and_unfired() {
        let trigger = trigger();
        assert!(trigger.active);
        assert!(trigger.last_fired_at.is_none());
    }

    #[test]
    fn deactivate_keeps_the_record() {
        let mut trigger = trigger();
        trigger.deactivate();
        assert!(!trigger.active);
    }

    #[tokio::test]
    async fn list_active_filters_deactivated() {
        let store = InMemoryTriggerStore::new();
        let active = trigger();
        let mut inactive = trigger();
        inactive.deactivate();

        let active_id = active.id;
        store.insert(active);
        store.insert(inactive);

        let listed = store.list_active().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, active_id);
    }

    #[tokio::test]
    async fn record_fired_stamps_timestamp() {
        let store = InMemoryTriggerStore::new();
        let trigger = trigger();
        let id = trigger.id;
        store.insert(trigger);

        let when = Utc::now();
        store.record_fired(id, when).await.expect("record");

        let stored = store.get(id).await.expect("get");
        assert_eq!(stored.last_fired_at, Some(when));
    }

    #[tokio::test]
    async fn missing_trigger_is_not_found() {
        let store = InMemoryTriggerStore::new();
        let id = TriggerId::new();
        let result = store.get(id).await;
        assert_eq!(result.unwrap_err(), TriggerError::NotFound { id });
    }

    #[test]
    fn trigger_serde_roundtrip() {
        let trigger = trigger();
        let json = serde_json::to_string(&trigger).expect("serialize");
        let parsed: AutonomousTrigger = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(trigger, parsed);
    }
}
