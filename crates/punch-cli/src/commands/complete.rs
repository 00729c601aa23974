//! Complete command.

use anyhow::{Context, Result};
use serde_json::json;

use punch_core::types::{SubTaskId, UserId};
use punch_core::{DomainEvent, format_countdown};
use punch_db::{Database, OpTime, ProofOfWork};

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

    let outcome = db.complete_sub_task(&sub_task_id, user_id, proof.as_ref(), OpTime::now())?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "sub_task": outcome.sub_task,
                "closed_duration_seconds": outcome.closed_duration_seconds,
            }))?
        );
    } else {
        println!(
            "Completed {} (total {})",
            outcome.sub_task.id,
            format_countdown(outcome.sub_task.total_seconds)
        );
        if let Some(duration) = outcome.closed_duration_seconds {
            println!("Closed open session after {}", format_countdown(duration));
        }
    }
    Ok(outcome.events)
}
