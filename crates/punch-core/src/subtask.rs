//! Sub-task and time-log domain types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::{Schedule, WindowEval, evaluate};
use crate::types::{BillingMode, CompanyId, SubTaskId, SubTaskStatus, TaskId, UserId};

/// A task grouping sub-tasks, owned by a company/tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub company_id: CompanyId,
    pub name: String,
}

/// A billable unit of work under a [`Task`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTask {
    pub id: SubTaskId,
    pub task_id: TaskId,
    pub name: String,
    pub billing_mode: BillingMode,
    pub fixed_price: Option<f64>,
    pub hourly_rate: Option<f64>,
    /// Estimated-hours budget, when one was set.
    pub estimated_hours: Option<f64>,
    #[serde(default)]
    pub schedule: Schedule,
    pub status: SubTaskStatus,
    /// Accumulated tracked seconds. Only ever increases, by exactly the
    /// duration of each closed time-log entry.
    pub total_seconds: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SubTask {
    /// The time budget in seconds, when `estimated_hours` is set.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn budget_seconds(&self) -> Option<i64> {
        self.estimated_hours.map(|hours| (hours * 3_600.0).round() as i64)
    }

    /// Remaining budget, clamped at zero once the estimate is exhausted.
    #[must_use]
    pub fn remaining_budget_seconds(&self) -> Option<i64> {
        self.budget_seconds()
            .map(|budget| (budget - self.total_seconds).max(0))
    }

    /// Evaluates this sub-task's schedule window at `now` (wall-clock time).
    #[must_use]
    pub fn evaluate_window(&self, now: NaiveDateTime) -> WindowEval {
        evaluate(self.billing_mode, &self.schedule, now)
    }
}

/// One open-or-closed tracking session in the append-only ledger.
///
/// For a given user at most one entry is open (`end_time` is `None`) at any
/// instant; entries are never deleted or reassigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLogEntry {
    pub id: String,
    pub user_id: UserId,
    pub sub_task_id: SubTaskId,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Populated only when the entry is closed.
    pub duration_seconds: Option<i64>,
}

impl TimeLogEntry {
    /// Whether this entry is still tracking.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Live elapsed seconds for an open entry.
    #[must_use]
    pub fn elapsed_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.start_time).num_seconds().max(0)
    }
}
