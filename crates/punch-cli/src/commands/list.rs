//! Task sub-task listing with schedule status and budget fields.

use anyhow::{Context, Result, bail};
use chrono::Local;
use serde::Serialize;

use punch_core::SubTask;
use punch_core::format_countdown;
use punch_core::schedule::ScheduleDisplay;
use punch_core::types::TaskId;
use punch_db::Database;

/// A sub-task enriched with its derived display fields.
#[derive(Debug, Serialize)]
struct SubTaskRow {
    #[serde(flatten)]
    sub_task: SubTask,
    schedule_display: ScheduleDisplay,
    budget_seconds: Option<i64>,
    remaining_budget_seconds: Option<i64>,
}

pub fn run(db: &Database, task: &str, json: bool) -> Result<()> {
    let task_id = TaskId::new(task).context("invalid task ID")?;
    let Some(task_row) = db.get_task(&task_id)? else {
        bail!("task not found: {task}");
    };

    let now = Local::now().naive_local();
    let rows: Vec<SubTaskRow> = db
        .list_sub_tasks(&task_id)?
        .into_iter()
        .map(|sub_task| {
            let eval = sub_task.evaluate_window(now);
            SubTaskRow {
                schedule_display: ScheduleDisplay::from_eval(&eval),
                budget_seconds: sub_task.budget_seconds(),
                remaining_budget_seconds: sub_task.remaining_budget_seconds(),
                sub_task,
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{} ({})", task_row.name, task_row.id);
    if rows.is_empty() {
        println!("  (no sub-tasks)");
        return Ok(());
    }
    for row in &rows {
        let schedule = match &row.schedule_display.countdown {
            Some(countdown) => format!("{} {countdown}", row.schedule_display.status),
            None => row.schedule_display.status.to_string(),
        };
        let budget = row
            .remaining_budget_seconds
            .map_or_else(String::new, |remaining| {
                format!(" [{} left]", format_countdown(remaining))
            });
        println!(
            "  {:<14} {:<12} {:>10} {:<22} {}{}",
            row.sub_task.id.as_str(),
            row.sub_task.status.as_str(),
            format_countdown(row.sub_task.total_seconds),
            schedule,
            row.sub_task.name,
            budget,
        );
    }
    Ok(())
}
