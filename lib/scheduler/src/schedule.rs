//! Cron schedule parsing and evaluation.
//!
//! Triggers carry standard 5-field cron expressions
//! (`minute hour day month weekday`). The `cron` crate wants a seconds
//! column, so one is pinned to zero before parsing.

use crate::error::SchedulerError;
use chrono::{DateTime, Utc};
use cron::Schedule;
use std::str::FromStr;

/// A parsed 5-field cron schedule.
#[derive(Debug, Clone)]
pub struct CronSchedule {
    expression: String,
    schedule: Schedule,
}

impl CronSchedule {
    /// Parses a 5-field cron expression.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression does not have exactly five
    /// fields or any field is malformed.
    pub fn parse(expression: &str) -> Result<Self, SchedulerError> {
        let parts: Vec<&str> = expression.split_whitespace().collect();
        if parts.len() != 5 {
            return Err(SchedulerError::InvalidCron {
                expression: expression.to_string(),
                reason: format!("expected 5 fields, got {}", parts.len()),
            });
        }

        let with_seconds = format!("0 {}", parts.join(" "));
        let schedule =
            Schedule::from_str(&with_seconds).map_err(|e| SchedulerError::InvalidCron {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    /// Returns the original 5-field expression.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Returns the next fire time strictly after the given instant.
    #[must_use]
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }
}
