//! Active-session query command.

use anyhow::Result;
use chrono::Utc;

use punch_core::format_countdown;
use punch_core::types::UserId;
use punch_db::Database;

pub fn run(db: &Database, user_id: &UserId, json: bool) -> Result<()> {
    match db.active_session(user_id, Utc::now())? {
        Some(active) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&active)?);
            } else {
                println!(
                    "Tracking {} ({}) for {}",
                    active.sub_task.name,
                    active.sub_task.id,
                    format_countdown(active.elapsed_seconds)
                );
            }
        }
        None => {
            if json {
                println!("null");
            } else {
                println!("No active session.");
            }
        }
    }
    Ok(())
}
