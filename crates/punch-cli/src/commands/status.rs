//! Status command showing a ledger overview.

use std::path::Path;

use anyhow::Result;
use serde_json::json;

use punch_db::Database;

pub fn run(db: &Database, database_path: &Path, json: bool) -> Result<()> {
    let summary = db.summary()?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "database_path": database_path,
                "tasks": summary.tasks,
                "sub_tasks": summary.sub_tasks,
                "employees": summary.employees,
                "open_sessions": summary.open_sessions,
                "closed_entries": summary.closed_entries,
            }))?
        );
    } else {
        println!("Database: {}", database_path.display());
        println!("  tasks           {}", summary.tasks);
        println!("  sub-tasks       {}", summary.sub_tasks);
        println!("  employees       {}", summary.employees);
        println!("  open sessions   {}", summary.open_sessions);
        println!("  closed entries  {}", summary.closed_entries);
    }
    Ok(())
}
