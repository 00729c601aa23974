//! Stop command.

use anyhow::{Context, Result};
use serde_json::json;

use punch_core::types::{SubTaskId, UserId};
use punch_core::{DomainEvent, format_countdown};
use punch_db::{Database, OpTime, SessionError};

pub fn run(
    db: &mut Database,
    user_id: &UserId,
    sub_task: &str,
    json: bool,
) -> Result<Vec<DomainEvent>> {
    let sub_task_id = SubTaskId::new(sub_task).context("invalid sub-task ID")?;
    match db.stop_session(&sub_task_id, user_id, OpTime::now()) {
        Ok(outcome) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "duration_seconds": outcome.duration_seconds,
                        "total_seconds": outcome.sub_task.total_seconds,
                    }))?
                );
            } else {
                println!(
                    "Stopped {} after {} (total {})",
                    outcome.sub_task.id,
                    format_countdown(outcome.duration_seconds),
                    format_countdown(outcome.sub_task.total_seconds)
                );
            }
            Ok(outcome.events)
        }
        // Expected condition: nothing was running.
        Err(SessionError::NoActiveSession { .. }) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&json!({ "stopped": false }))?);
            } else {
                println!("No active session on {sub_task}.");
            }
            Ok(Vec::new())
        }
        Err(err) => Err(err.into()),
    }
}
