//! Pay-period earnings over the ledger.
//!
//! Single-employee snapshots read the ledger directly; the batch path fans
//! out over a bounded worker pool with one read connection per worker so a
//! large company can never exhaust database connections. The bound is a
//! first-class, tunable parameter ([`BatchOptions`]), not an incidental
//! slicing detail.
//!
//! Earnings are a live projection: batch reads are not transactionally
//! consistent with in-flight session operations, and do not need to be —
//! each snapshot reflects ledger state as of read time.

use std::path::Path;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use rusqlite::params;
use thiserror::Error;

use punch_core::earnings::{EarningsSnapshot, PayAdjustments, PayPeriod, compute_snapshot};
use punch_core::types::{CompanyId, UserId};

use crate::{Database, DbError, format_timestamp};

/// Payroll computation errors.
#[derive(Debug, Error)]
pub enum PayrollError {
    #[error("employee not found: {0}")]
    EmployeeNotFound(UserId),
    /// One employee's earnings could not be computed. Recovered per-employee
    /// in batch mode; surfaced as an error on the single-employee path.
    #[error("earnings could not be computed for {user_id}: {message}")]
    Calculation { user_id: UserId, message: String },
    #[error("failed to build earnings worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
}

impl PayrollError {
    /// HTTP status a transport adapter should map this error to.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::EmployeeNotFound(_) => 404,
            Self::Calculation { .. } | Self::Pool(_) | Self::Storage(_) => 500,
        }
    }
}

/// Concurrency ceiling for batch earnings.
///
/// At most `batch_size` employees are computed at once, each on its own read
/// connection. Raising it trades database connections for throughput.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { batch_size: 3 }
    }
}

impl Database {
    /// Sums closed ledger durations for a user within `[start, end)`.
    pub fn worked_seconds(&self, user_id: &UserId, period: &PayPeriod) -> Result<i64, DbError> {
        let seconds = self.conn.query_row(
            "
            SELECT COALESCE(SUM(duration_seconds), 0)
            FROM time_logs
            WHERE user_id = ? AND end_time IS NOT NULL
              AND start_time >= ? AND start_time < ?
            ",
            params![
                user_id.as_str(),
                format_timestamp(period.start),
                format_timestamp(period.end),
            ],
            |row| row.get(0),
        )?;
        Ok(seconds)
    }

    /// Looks up the collaborator-provided adjustments for a user and period.
    ///
    /// A missing record means all-zero adjustments, not an error.
    pub fn pay_adjustments(
        &self,
        user_id: &UserId,
        period_start: DateTime<Utc>,
    ) -> Result<PayAdjustments, DbError> {
        use rusqlite::OptionalExtension;

        let row = self
            .conn
            .query_row(
                "
                SELECT overtime_hours, overtime_pay, leave_days, leave_pay, penalty_amount
                FROM pay_adjustments
                WHERE user_id = ? AND period_start = ?
                ",
                params![user_id.as_str(), format_timestamp(period_start)],
                |row| {
                    Ok(PayAdjustments {
                        overtime_hours: row.get(0)?,
                        overtime_pay: row.get(1)?,
                        leave_days: row.get(2)?,
                        leave_pay: row.get(3)?,
                        penalty_amount: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row.unwrap_or_default())
    }

    /// Computes the earnings snapshot for one employee.
    ///
    /// A malformed compensation row surfaces as
    /// [`PayrollError::Calculation`]; callers in batch mode recover from it
    /// per-employee, the single-employee path reports it.
    pub fn earnings_snapshot(
        &self,
        user_id: &UserId,
        period: &PayPeriod,
        now: DateTime<Utc>,
    ) -> Result<EarningsSnapshot, PayrollError> {
        let employee = match self.get_employee(user_id) {
            Ok(Some(employee)) => employee,
            Ok(None) => return Err(PayrollError::EmployeeNotFound(user_id.clone())),
            Err(DbError::InvalidRow { message, .. }) => {
                return Err(PayrollError::Calculation {
                    user_id: user_id.clone(),
                    message,
                });
            }
            Err(err) => return Err(err.into()),
        };
        let worked_seconds = self.worked_seconds(user_id, period)?;
        let adjustments = self.pay_adjustments(user_id, period.start)?;
        Ok(compute_snapshot(
            employee.id,
            &employee.compensation,
            worked_seconds,
            &adjustments,
            period,
            now,
        ))
    }
}

/// Computes snapshots for every active employee of a company.
///
/// Runs on a worker pool bounded by [`BatchOptions::batch_size`]; each
/// worker opens its own read connection against `db_path`. A per-employee
/// failure is substituted with a zero-valued snapshot carrying the
/// employee's identity and declared currency — one bad compensation row
/// never aborts the batch.
pub fn company_earnings(
    db_path: &Path,
    company_id: &CompanyId,
    period: &PayPeriod,
    now: DateTime<Utc>,
    options: BatchOptions,
) -> Result<Vec<EarningsSnapshot>, PayrollError> {
    let employees = {
        let db = Database::open(db_path)?;
        db.list_active_employees(company_id)?
    };
    if employees.is_empty() {
        return Ok(Vec::new());
    }

    let batch_size = options.batch_size.max(1);
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(batch_size)
        .build()?;

    let snapshots = pool.install(|| {
        employees
            .par_iter()
            .map(|employee| {
                let result = Database::open(db_path)
                    .map_err(PayrollError::from)
                    .and_then(|db| db.earnings_snapshot(&employee.id, period, now));
                match result {
                    Ok(snapshot) => snapshot,
                    Err(err) => {
                        tracing::warn!(
                            user = %employee.id,
                            error = %err,
                            "earnings computation failed, substituting zero snapshot"
                        );
                        EarningsSnapshot::zeroed(
                            employee.id.clone(),
                            employee.currency.clone(),
                            period,
                        )
                    }
                }
            })
            .collect()
    });
    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use punch_core::earnings::{Compensation, PayBasis};
    use punch_core::schedule::Schedule;
    use punch_core::types::{BillingMode, SubTaskId, TaskId};
    use punch_core::Task;

    use crate::session::OpTime;
    use crate::{AdjustmentRecord, Employee, ImportBatch, SubTaskDef};

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, hh, mm, 0).unwrap()
    }

    fn august() -> PayPeriod {
        PayPeriod {
            start: utc(2026, 8, 1, 0, 0),
            end: utc(2026, 9, 1, 0, 0),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn hourly_employee(id: &str, rate: f64) -> Employee {
        Employee {
            id: user(id),
            company_id: CompanyId::new("acme").unwrap(),
            name: id.to_string(),
            active: true,
            compensation: Compensation {
                basis: PayBasis::Hourly { rate },
                currency: "USD".into(),
                work_days: Compensation::default_work_days(),
            },
        }
    }

    fn monthly_employee(id: &str, salary: f64) -> Employee {
        Employee {
            compensation: Compensation {
                basis: PayBasis::Monthly { salary },
                currency: "EUR".into(),
                work_days: Compensation::default_work_days(),
            },
            ..hourly_employee(id, 0.0)
        }
    }

    fn base_batch() -> ImportBatch {
        ImportBatch {
            tasks: vec![Task {
                id: TaskId::new("t1").unwrap(),
                company_id: CompanyId::new("acme").unwrap(),
                name: "Website".into(),
            }],
            sub_tasks: vec![SubTaskDef {
                id: SubTaskId::new("st-a").unwrap(),
                task_id: TaskId::new("t1").unwrap(),
                name: "API".into(),
                billing_mode: BillingMode::Hourly,
                fixed_price: None,
                hourly_rate: Some(40.0),
                estimated_hours: None,
                schedule: Schedule::unscheduled(),
            }],
            employees: vec![hourly_employee("u1", 40.0)],
            adjustments: vec![],
        }
    }

    #[test]
    fn hourly_snapshot_sums_closed_ledger_durations() {
        let mut db = Database::open_in_memory().unwrap();
        db.apply_import(&base_batch(), utc(2026, 8, 1, 0, 0)).unwrap();

        let st = SubTaskId::new("st-a").unwrap();
        // Two sessions: 30 minutes and 15 minutes.
        db.start_session(&st, &user("u1"), OpTime::from_utc(utc(2026, 8, 3, 9, 0)))
            .unwrap();
        db.stop_session(&st, &user("u1"), OpTime::from_utc(utc(2026, 8, 3, 9, 30)))
            .unwrap();
        db.start_session(&st, &user("u1"), OpTime::from_utc(utc(2026, 8, 4, 9, 0)))
            .unwrap();
        db.stop_session(&st, &user("u1"), OpTime::from_utc(utc(2026, 8, 4, 9, 15)))
            .unwrap();

        let snapshot = db
            .earnings_snapshot(&user("u1"), &august(), utc(2026, 8, 6, 12, 0))
            .unwrap();
        assert_eq!(snapshot.worked_seconds, 2_700);
        assert!(close(snapshot.worked_hours, 0.75));
        assert!(close(snapshot.worked_amount, 30.0));
        assert!(close(snapshot.net_amount, 30.0));
    }

    #[test]
    fn open_sessions_do_not_count_toward_earnings() {
        let mut db = Database::open_in_memory().unwrap();
        db.apply_import(&base_batch(), utc(2026, 8, 1, 0, 0)).unwrap();
        let st = SubTaskId::new("st-a").unwrap();
        db.start_session(&st, &user("u1"), OpTime::from_utc(utc(2026, 8, 3, 9, 0)))
            .unwrap();

        let snapshot = db
            .earnings_snapshot(&user("u1"), &august(), utc(2026, 8, 3, 12, 0))
            .unwrap();
        assert_eq!(snapshot.worked_seconds, 0);
    }

    #[test]
    fn period_bounds_are_half_open() {
        let mut db = Database::open_in_memory().unwrap();
        db.apply_import(&base_batch(), utc(2026, 8, 1, 0, 0)).unwrap();
        let st = SubTaskId::new("st-a").unwrap();

        // Before the period, inside it, and starting exactly at its end.
        for (start, stop) in [
            (utc(2026, 7, 31, 9, 0), utc(2026, 7, 31, 10, 0)),
            (utc(2026, 8, 10, 9, 0), utc(2026, 8, 10, 9, 20)),
            (utc(2026, 9, 1, 0, 0), utc(2026, 9, 1, 1, 0)),
        ] {
            db.start_session(&st, &user("u1"), OpTime::from_utc(start)).unwrap();
            db.stop_session(&st, &user("u1"), OpTime::from_utc(stop)).unwrap();
        }

        let worked = db.worked_seconds(&user("u1"), &august()).unwrap();
        assert_eq!(worked, 1_200);
    }

    #[test]
    fn adjustments_combine_into_gross_and_net() {
        let mut db = Database::open_in_memory().unwrap();
        let mut batch = base_batch();
        batch.adjustments.push(AdjustmentRecord {
            user_id: user("u1"),
            period_start: august().start,
            adjustments: PayAdjustments {
                overtime_hours: 2.0,
                overtime_pay: 120.0,
                leave_days: 1.0,
                leave_pay: 80.0,
                penalty_amount: 25.0,
            },
        });
        db.apply_import(&batch, utc(2026, 8, 1, 0, 0)).unwrap();

        let snapshot = db
            .earnings_snapshot(&user("u1"), &august(), utc(2026, 8, 6, 12, 0))
            .unwrap();
        assert!(close(snapshot.gross_amount, 200.0));
        assert!(close(snapshot.net_amount, 175.0));
        assert!(close(snapshot.overtime_hours, 2.0));
    }

    #[test]
    fn missing_employee_is_an_error_on_single_path() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .earnings_snapshot(&user("ghost"), &august(), utc(2026, 8, 6, 12, 0))
            .unwrap_err();
        assert!(matches!(err, PayrollError::EmployeeNotFound(_)));
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn malformed_compensation_is_a_calculation_failure_on_single_path() {
        let mut db = Database::open_in_memory().unwrap();
        db.apply_import(&base_batch(), utc(2026, 8, 1, 0, 0)).unwrap();
        db.conn
            .execute("UPDATE employees SET pay_kind = 'weekly' WHERE id = 'u1'", [])
            .unwrap();

        let err = db
            .earnings_snapshot(&user("u1"), &august(), utc(2026, 8, 6, 12, 0))
            .unwrap_err();
        assert!(matches!(err, PayrollError::Calculation { .. }));
        assert_eq!(err.status(), 500);
    }

    #[test]
    fn default_batch_size_is_three() {
        assert_eq!(BatchOptions::default().batch_size, 3);
    }

    #[test]
    fn company_earnings_covers_every_active_employee() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("punch.db");
        {
            let mut db = Database::open(&path).unwrap();
            let mut batch = base_batch();
            batch.employees = (0..10)
                .map(|i| monthly_employee(&format!("emp-{i}"), 2_100.0))
                .collect();
            db.apply_import(&batch, utc(2026, 8, 1, 0, 0)).unwrap();
        }

        let snapshots = company_earnings(
            &path,
            &CompanyId::new("acme").unwrap(),
            &august(),
            utc(2026, 8, 6, 12, 0),
            BatchOptions::default(),
        )
        .unwrap();

        assert_eq!(snapshots.len(), 10);
        for snapshot in &snapshots {
            assert!(snapshot.worked_amount > 0.0);
            assert_eq!(snapshot.currency, "EUR");
        }
    }

    #[test]
    fn one_broken_compensation_row_yields_a_zero_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("punch.db");
        {
            let mut db = Database::open(&path).unwrap();
            let mut batch = base_batch();
            batch.employees = (0..10)
                .map(|i| monthly_employee(&format!("emp-{i}"), 2_100.0))
                .collect();
            db.apply_import(&batch, utc(2026, 8, 1, 0, 0)).unwrap();
            // Employee #4's compensation lookup will fail to parse.
            db.conn
                .execute(
                    "UPDATE employees SET pay_kind = 'weekly' WHERE id = 'emp-3'",
                    [],
                )
                .unwrap();
        }

        let snapshots = company_earnings(
            &path,
            &CompanyId::new("acme").unwrap(),
            &august(),
            utc(2026, 8, 6, 12, 0),
            BatchOptions::default(),
        )
        .unwrap();

        assert_eq!(snapshots.len(), 10);
        let broken = snapshots
            .iter()
            .find(|s| s.user_id.as_str() == "emp-3")
            .unwrap();
        assert_eq!(broken.worked_seconds, 0);
        assert!(close(broken.net_amount, 0.0));
        assert_eq!(broken.currency, "EUR");
        let intact = snapshots
            .iter()
            .filter(|s| s.user_id.as_str() != "emp-3")
            .count();
        assert_eq!(intact, 9);
        for snapshot in snapshots.iter().filter(|s| s.user_id.as_str() != "emp-3") {
            assert!(snapshot.worked_amount > 0.0);
        }
    }

    #[test]
    fn batch_size_one_still_covers_everyone() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("punch.db");
        {
            let mut db = Database::open(&path).unwrap();
            let mut batch = base_batch();
            batch.employees = (0..5)
                .map(|i| monthly_employee(&format!("emp-{i}"), 2_100.0))
                .collect();
            db.apply_import(&batch, utc(2026, 8, 1, 0, 0)).unwrap();
        }

        let snapshots = company_earnings(
            &path,
            &CompanyId::new("acme").unwrap(),
            &august(),
            utc(2026, 8, 6, 12, 0),
            BatchOptions { batch_size: 1 },
        )
        .unwrap();
        assert_eq!(snapshots.len(), 5);
    }

    #[test]
    fn empty_company_yields_empty_batch() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("punch.db");
        drop(Database::open(&path).unwrap());

        let snapshots = company_earnings(
            &path,
            &CompanyId::new("nobody").unwrap(),
            &august(),
            utc(2026, 8, 6, 12, 0),
            BatchOptions::default(),
        )
        .unwrap();
        assert!(snapshots.is_empty());
    }
}
