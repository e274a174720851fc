//! Autonomous trigger scheduler for the loomflow platform.
//!
//! This crate arms one recurring task per active [`AutonomousTrigger`]
//! and starts a workflow execution on every fire:
//!
//! - **Schedule**: 5-field cron parsing and next-fire evaluation
//! - **Triggers**: the trigger record and its store boundary
//! - **Runner**: the scheduler service itself

pub mod error;
pub mod runner;
pub mod schedule;
pub mod trigger;

pub use error::{SchedulerError, TriggerError};
pub use runner::Scheduler;
pub use schedule::CronSchedule;
pub use trigger::{AutonomousTrigger, InMemoryTriggerStore, TriggerStore};
