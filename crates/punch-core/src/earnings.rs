//! Pay-period earnings arithmetic.
//!
//! Pure computation over accumulated seconds and compensation configuration.
//! Pay-period boundaries are owned by an external payroll collaborator; this
//! module only consumes a `[start, end)` interval. Overtime, leave, and
//! penalty figures likewise arrive precomputed ([`PayAdjustments`]) and are
//! combined additively/subtractively here.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{UserId, ValidationError};

/// An externally-defined pay period, inclusive of `start` and exclusive of
/// `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// How an employee is paid. Storage tag for [`PayBasis`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayKind {
    Hourly,
    Monthly,
}

impl PayKind {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for PayKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PayKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(ValidationError::InvalidPayKind {
                value: s.to_string(),
            }),
        }
    }
}

/// Compensation basis with its rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PayBasis {
    /// Paid per tracked hour.
    Hourly { rate: f64 },
    /// Paid a monthly salary, pro-rated over scheduled working days.
    Monthly { salary: f64 },
}

impl PayBasis {
    #[must_use]
    pub const fn kind(&self) -> PayKind {
        match self {
            Self::Hourly { .. } => PayKind::Hourly,
            Self::Monthly { .. } => PayKind::Monthly,
        }
    }
}

/// An employee's compensation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compensation {
    pub basis: PayBasis,
    pub currency: String,
    /// Weekday indices (0=Sunday … 6=Saturday) counted as working days for
    /// monthly pro-ration.
    pub work_days: Vec<u8>,
}

impl Compensation {
    /// Monday through Friday.
    #[must_use]
    pub fn default_work_days() -> Vec<u8> {
        vec![1, 2, 3, 4, 5]
    }
}

/// Precomputed overtime/leave/penalty figures for one user and period.
///
/// Produced by the compensation-configuration collaborator; a missing record
/// means all-zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PayAdjustments {
    pub overtime_hours: f64,
    pub overtime_pay: f64,
    pub leave_days: f64,
    pub leave_pay: f64,
    pub penalty_amount: f64,
}

/// A point-in-time earnings projection for one user over one pay period.
///
/// Recomputed on demand, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsSnapshot {
    pub user_id: UserId,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub worked_seconds: i64,
    pub worked_hours: f64,
    pub worked_amount: f64,
    pub overtime_hours: f64,
    pub overtime_pay: f64,
    pub leave_days: f64,
    pub leave_pay: f64,
    pub penalty_amount: f64,
    pub gross_amount: f64,
    pub net_amount: f64,
    pub currency: String,
}

impl EarningsSnapshot {
    /// A zero-valued snapshot carrying only the employee's identity and
    /// currency. Substituted when one employee's computation fails inside a
    /// batch so the rest of the batch can proceed.
    #[must_use]
    pub fn zeroed(user_id: UserId, currency: String, period: &PayPeriod) -> Self {
        Self {
            user_id,
            period_start: period.start,
            period_end: period.end,
            worked_seconds: 0,
            worked_hours: 0.0,
            worked_amount: 0.0,
            overtime_hours: 0.0,
            overtime_pay: 0.0,
            leave_days: 0.0,
            leave_pay: 0.0,
            penalty_amount: 0.0,
            gross_amount: 0.0,
            net_amount: 0.0,
            currency,
        }
    }
}

/// Converts tracked seconds at an hourly rate to an amount.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn hourly_amount(seconds: i64, rate: f64) -> f64 {
    seconds as f64 / 3_600.0 * rate
}

/// Counts working days in `[start, end)`.
fn working_days_between(start: NaiveDate, end: NaiveDate, work_days: &[u8]) -> u32 {
    use chrono::Datelike;

    let mut count = 0;
    let mut day = start;
    while day < end {
        let index = u8::try_from(day.weekday().num_days_from_sunday()).unwrap_or(0);
        if work_days.contains(&index) {
            count += 1;
        }
        day += Duration::days(1);
    }
    count
}

/// Pro-rates a monthly salary by elapsed vs. total working days.
///
/// A period with zero working days yields zero rather than dividing by zero.
#[must_use]
pub fn prorate_salary(salary: f64, elapsed_days: u32, total_days: u32) -> f64 {
    if total_days == 0 {
        return 0.0;
    }
    salary * f64::from(elapsed_days) / f64::from(total_days)
}

/// Computes the full earnings snapshot for one user.
///
/// `worked_seconds` is the sum of closed ledger durations within the period;
/// `now` anchors "elapsed so far" for monthly pro-ration. Working days are
/// counted over the period's UTC calendar dates.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn compute_snapshot(
    user_id: UserId,
    compensation: &Compensation,
    worked_seconds: i64,
    adjustments: &PayAdjustments,
    period: &PayPeriod,
    now: DateTime<Utc>,
) -> EarningsSnapshot {
    let worked_hours = worked_seconds as f64 / 3_600.0;

    let worked_amount = match compensation.basis {
        PayBasis::Hourly { rate } => hourly_amount(worked_seconds, rate),
        PayBasis::Monthly { salary } => {
            let start = period.start.date_naive();
            let end = period.end.date_naive();
            // Elapsed days include today, clamped into the period.
            let elapsed_until = (now.date_naive() + Duration::days(1)).max(start).min(end);
            let total = working_days_between(start, end, &compensation.work_days);
            let elapsed = working_days_between(start, elapsed_until, &compensation.work_days);
            prorate_salary(salary, elapsed, total)
        }
    };

    let gross_amount = worked_amount + adjustments.overtime_pay + adjustments.leave_pay;
    let net_amount = gross_amount - adjustments.penalty_amount;

    EarningsSnapshot {
        user_id,
        period_start: period.start,
        period_end: period.end,
        worked_seconds,
        worked_hours,
        worked_amount,
        overtime_hours: adjustments.overtime_hours,
        overtime_pay: adjustments.overtime_pay,
        leave_days: adjustments.leave_days,
        leave_pay: adjustments.leave_pay,
        penalty_amount: adjustments.penalty_amount,
        gross_amount,
        net_amount,
        currency: compensation.currency.clone(),
    }
}
