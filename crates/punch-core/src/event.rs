//! Domain events emitted toward the real-time fan-out boundary.
//!
//! The session and payroll operations return these; the caller forwards them
//! to whatever transport is configured. `earnings:updated` accompanies every
//! change to accumulated seconds so dependent clients know to re-pull a
//! snapshot.

use serde::{Deserialize, Serialize};

use crate::types::{SubTaskId, TaskId, UserId};

/// Why a session was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Explicit user action.
    User,
    /// A scheduling collaborator closed the window.
    ScheduledEnd,
}

impl StopReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::ScheduledEnd => "scheduled_end",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain event on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DomainEvent {
    #[serde(rename = "subtask:started")]
    SubTaskStarted {
        sub_task_id: SubTaskId,
        task_id: TaskId,
        user_id: UserId,
        /// The sub-task that was auto-paused to admit this start, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stopped_sub_task_id: Option<SubTaskId>,
    },
    #[serde(rename = "subtask:completed")]
    SubTaskCompleted {
        sub_task_id: SubTaskId,
        task_id: TaskId,
        user_id: UserId,
        /// Duration of the session closed by completion, when one was open.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_seconds: Option<i64>,
    },
    #[serde(rename = "subtask:auto-stopped")]
    SubTaskAutoStopped {
        sub_task_id: SubTaskId,
        task_id: TaskId,
        user_id: UserId,
        duration_seconds: i64,
        reason: StopReason,
    },
    #[serde(rename = "earnings:updated")]
    EarningsUpdated { user_id: UserId },
}
