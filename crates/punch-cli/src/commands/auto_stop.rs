//! Auto-stop command, invoked by the scheduling collaborator when a window
//! closes.

use anyhow::{Context, Result};
use serde_json::json;

use punch_core::types::{SubTaskId, UserId};
use punch_core::{DomainEvent, format_countdown};
use punch_db::{Database, OpTime, ProofOfWork, SessionError};

pub fn run(
    db: &mut Database,
    user_id: &UserId,
    sub_task: &str,
    comment: Option<String>,
    attachments: Vec<String>,
    json: bool,
) -> Result<Vec<DomainEvent>> {
    let sub_task_id = SubTaskId::new(sub_task).context("invalid sub-task ID")?;
    let proof = (comment.is_some() || !attachments.is_empty()).then(|| ProofOfWork {
        comment,
        attachments,
    });

    match db.auto_stop_session(&sub_task_id, user_id, proof.as_ref(), OpTime::now()) {
        Ok(outcome) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "duration_seconds": outcome.duration_seconds,
                        "total_seconds": outcome.sub_task.total_seconds,
                        "reason": "scheduled_end",
                    }))?
                );
            } else {
                println!(
                    "Auto-stopped {} after {} (window closed)",
                    outcome.sub_task.id,
                    format_countdown(outcome.duration_seconds)
                );
            }
            Ok(outcome.events)
        }
        // Expected condition: the window closed with nothing running.
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
