//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Employee time tracker.
///
/// Tracks effort against billable sub-tasks, gates scheduled sub-tasks
/// behind their recurring time windows, and computes pay-period earnings
/// from the session ledger.
#[derive(Debug, Parser)]
#[command(name = "punch", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as this user (defaults to `default_user` from config).
    #[arg(short, long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start tracking a sub-task.
    ///
    /// Auto-pauses any other session you have open; refused with a countdown
    /// when the sub-task's schedule window is closed.
    Start {
        /// The sub-task ID.
        sub_task: String,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Stop your open session on a sub-task.
    Stop {
        /// The sub-task ID.
        sub_task: String,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Complete a sub-task, closing your open session on it first if any.
    Complete {
        /// The sub-task ID.
        sub_task: String,

        /// Proof-of-work comment.
        #[arg(long)]
        comment: Option<String>,

        /// Proof-of-work attachment reference (repeatable).
        #[arg(long = "attachment")]
        attachments: Vec<String>,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Stop a session on behalf of the scheduler when a window closes.
    AutoStop {
        /// The sub-task ID.
        sub_task: String,

        /// Proof-of-work comment.
        #[arg(long)]
        comment: Option<String>,

        /// Proof-of-work attachment reference (repeatable).
        #[arg(long = "attachment")]
        attachments: Vec<String>,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show your open session, if any, with live elapsed time.
    Active {
        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// List a task's sub-tasks with schedule status and budget.
    List {
        /// The task ID.
        task: String,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the earnings snapshot for the current pay period.
    Earnings {
        /// Period start date (defaults to the first of the current month).
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Period end date, exclusive (defaults to the first of next month).
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Compute earnings snapshots for every active employee of a company.
    CompanyEarnings {
        /// The company ID.
        company: String,

        /// Period start date (defaults to the first of the current month).
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Period end date, exclusive (defaults to the first of next month).
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Concurrency ceiling for the batch (defaults to config).
        #[arg(long)]
        batch_size: Option<usize>,

        /// Output JSON.
        #[arg(long)]
        json: bool,
    },

    /// Import tasks, sub-tasks, employees, and pay adjustments from the
    /// administration system (JSON document on stdin).
    Import,

    /// Show ledger overview.
    Status {
        /// Output JSON.
        #[arg(long)]
        json: bool,
    },
}
