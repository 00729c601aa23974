//! Batch earnings command for a whole company.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, Utc};

use punch_core::types::CompanyId;
use punch_db::BatchOptions;

use super::period;
use crate::Config;

pub fn run(
    config: &Config,
    company: &str,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    batch_size: Option<usize>,
    json: bool,
) -> Result<()> {
    let company_id = CompanyId::new(company).context("invalid company ID")?;
    let pay_period = period::resolve(from, to, Local::now().date_naive());
    let options = BatchOptions {
        batch_size: batch_size.unwrap_or(config.earnings_batch_size),
    };

    let snapshots = punch_db::company_earnings(
        &config.database_path,
        &company_id,
        &pay_period,
        Utc::now(),
        options,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
        return Ok(());
    }

    if snapshots.is_empty() {
        println!("No active employees for {company}.");
        return Ok(());
    }
    println!(
        "Earnings for {company} ({} to {})",
        pay_period.start.format("%Y-%m-%d"),
        pay_period.end.format("%Y-%m-%d")
    );
    for snapshot in &snapshots {
        println!(
            "  {:<16} {:>10.2} h  net {:>12.2} {}",
            snapshot.user_id.as_str(),
            snapshot.worked_hours,
            snapshot.net_amount,
            snapshot.currency
        );
    }
    Ok(())
}
