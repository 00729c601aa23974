//! Start command.

use anyhow::{Context, Result};
use serde_json::json;

use punch_core::schedule::ScheduleDisplay;
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
    match db.start_session(&sub_task_id, user_id, OpTime::now()) {
        Ok(outcome) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "time_log": outcome.log,
                        "sub_task": outcome.sub_task,
                        "stopped_sub_task": outcome.stopped,
                    }))?
                );
            } else {
                println!(
                    "Started {} ({})",
                    outcome.sub_task.name,
                    outcome.sub_task.id
                );
                if let Some(stopped) = &outcome.stopped {
                    println!(
                        "Paused {} after {}",
                        stopped.sub_task_id,
                        format_countdown(stopped.duration_seconds)
                    );
                }
            }
            Ok(outcome.events)
        }
        // Expected condition: render the countdown, not a server error.
        Err(SessionError::ScheduleLocked { eval }) => {
            let display = ScheduleDisplay::from_eval(&eval);
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "schedule_locked": true,
                        "status": display.status,
                        "countdown": display.countdown,
                        "eval": eval,
                    }))?
                );
            } else {
                let reason = eval
                    .reason
                    .map_or_else(|| "window closed".to_string(), |r| r.to_string());
                match &display.countdown {
                    Some(countdown) => println!("Locked: {reason} (starts in {countdown})"),
                    None => println!("Locked: {reason}"),
                }
            }
            Ok(Vec::new())
        }
        Err(err) => Err(err.into()),
    }
}
