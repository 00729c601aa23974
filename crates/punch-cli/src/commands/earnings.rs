//! Single-employee earnings command.

use anyhow::Result;
use chrono::{Local, NaiveDate, Utc};

use punch_core::EarningsSnapshot;
use punch_core::types::UserId;
use punch_db::Database;

use super::period;

pub fn run(
    db: &Database,
    user_id: &UserId,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    json: bool,
) -> Result<()> {
    let pay_period = period::resolve(from, to, Local::now().date_naive());
    let snapshot = db.earnings_snapshot(user_id, &pay_period, Utc::now())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }
    Ok(())
}

fn print_snapshot(snapshot: &EarningsSnapshot) {
    println!(
        "Earnings for {} ({} to {})",
        snapshot.user_id,
        snapshot.period_start.format("%Y-%m-%d"),
        snapshot.period_end.format("%Y-%m-%d")
    );
    println!(
        "  worked    {:>10.2} h   {:>12.2} {}",
        snapshot.worked_hours, snapshot.worked_amount, snapshot.currency
    );
    println!(
        "  overtime  {:>10.2} h   {:>12.2} {}",
        snapshot.overtime_hours, snapshot.overtime_pay, snapshot.currency
    );
    println!(
        "  leave     {:>10.2} d   {:>12.2} {}",
        snapshot.leave_days, snapshot.leave_pay, snapshot.currency
    );
    println!(
        "  penalty                 {:>12.2} {}",
        snapshot.penalty_amount, snapshot.currency
    );
    println!(
        "  gross                   {:>12.2} {}",
        snapshot.gross_amount, snapshot.currency
    );
    println!(
        "  net                     {:>12.2} {}",
        snapshot.net_amount, snapshot.currency
    );
}
