//! Storage layer for the punch time tracker.
//!
//! Provides persistence for tasks, sub-tasks, the time-log ledger, and
//! employee compensation using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. A `Database` instance can be moved between threads but cannot
//! be shared across threads without external synchronization. For concurrent
//! access, open a separate `Database` per thread — the batch earnings path
//! in [`payroll`] does exactly that, bounded by its worker-pool size.
//!
//! Every connection gets a busy timeout (see [`OpenOptions`]) so no
//! persistence call blocks indefinitely; a writer that cannot acquire the
//! lock in time surfaces a retryable error instead of hanging.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in ISO 8601 format (e.g.,
//! `2024-01-15T10:30:00Z`), always UTC. Lexicographic ordering matches
//! chronological ordering, which the period-range queries rely on.
//! Schedule times-of-day are stored as `HH:MM:SS` TEXT.
//!
//! ## Ledger invariant
//!
//! `time_logs` is append-only: rows are inserted open and closed in place,
//! never deleted. The partial unique index on `time_logs(user_id) WHERE
//! end_time IS NULL` makes "at most one open entry per user" a structural
//! guarantee on top of the transactional enforcement in [`session`].

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use thiserror::Error;

use punch_core::earnings::{Compensation, PayAdjustments, PayBasis, PayKind};
use punch_core::schedule::Schedule;
use punch_core::types::{BillingMode, CompanyId, SubTaskId, TaskId, UserId};
use punch_core::{SubTask, Task};

pub mod payroll;
pub mod session;

pub use payroll::{BatchOptions, PayrollError, company_earnings};
pub use session::{
    ActiveSession, CompleteOutcome, OpTime, ProofOfWork, SessionError, StartOutcome, StopOutcome,
    StoppedSession,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp in {table} for {id}: {value}")]
    TimestampParse {
        table: &'static str,
        id: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row failed domain validation.
    #[error("invalid row in {table} for {id}: {message}")]
    InvalidRow {
        table: &'static str,
        id: String,
        message: String,
    },
}

pub(crate) fn invalid_row(
    table: &'static str,
    id: &str,
    message: impl std::fmt::Display,
) -> DbError {
    DbError::InvalidRow {
        table,
        id: id.to_string(),
        message: message.to_string(),
    }
}

/// Connection tuning applied on open.
#[derive(Debug, Clone, Copy)]
pub struct OpenOptions {
    /// How long a blocked statement waits for the write lock before
    /// surfacing `SQLITE_BUSY`.
    pub busy_timeout_ms: u64,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: 5_000,
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// An active employee as listed for batch earnings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveEmployee {
    pub id: UserId,
    pub currency: String,
}

/// An employee row with compensation configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Employee {
    pub id: UserId,
    pub company_id: CompanyId,
    pub name: String,
    pub active: bool,
    pub compensation: Compensation,
}

/// Sub-task definition fields as supplied by the administration system.
///
/// Status and accumulated seconds are ledger-owned and never imported.
#[derive(Debug, Clone, PartialEq)]
pub struct SubTaskDef {
    pub id: SubTaskId,
    pub task_id: TaskId,
    pub name: String,
    pub billing_mode: BillingMode,
    pub fixed_price: Option<f64>,
    pub hourly_rate: Option<f64>,
    pub estimated_hours: Option<f64>,
    pub schedule: Schedule,
}

/// A pay-adjustment record keyed by user and period start.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentRecord {
    pub user_id: UserId,
    pub period_start: DateTime<Utc>,
    pub adjustments: PayAdjustments,
}

/// One sync document from the administration system.
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub tasks: Vec<Task>,
    pub sub_tasks: Vec<SubTaskDef>,
    pub employees: Vec<Employee>,
    pub adjustments: Vec<AdjustmentRecord>,
}

/// Row counts written by an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub tasks: usize,
    pub sub_tasks: usize,
    pub employees: usize,
    pub adjustments: usize,
}

/// Ledger overview for the status command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSummary {
    pub tasks: usize,
    pub sub_tasks: usize,
    pub employees: usize,
    pub open_sessions: usize,
    pub closed_entries: usize,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        Self::open_with(path, OpenOptions::default())
    }

    /// Opens a database with explicit connection tuning.
    pub fn open_with(path: &Path, options: OpenOptions) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                company_id TEXT NOT NULL,
                name TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_company ON tasks(company_id);

            -- Sub-tasks: definition fields come from the administration
            -- system; status and total_seconds are owned by the ledger.
            -- schedule_days: JSON array of weekday indices (0=Sunday).
            CREATE TABLE IF NOT EXISTS sub_tasks (
                id TEXT PRIMARY KEY,
                task_id TEXT NOT NULL,
                name TEXT NOT NULL,
                billing_mode TEXT NOT NULL,
                fixed_price REAL,
                hourly_rate REAL,
                estimated_hours REAL,
                schedule_start TEXT,
                schedule_end TEXT,
                schedule_days TEXT NOT NULL DEFAULT '[]',
                status TEXT NOT NULL DEFAULT 'pending',
                total_seconds INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_sub_tasks_task ON sub_tasks(task_id);

            -- Append-only session ledger. Rows are closed in place, never
            -- deleted. The partial unique index guarantees at most one open
            -- entry per user.
            CREATE TABLE IF NOT EXISTS time_logs (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                sub_task_id TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT,
                duration_seconds INTEGER,
                FOREIGN KEY (sub_task_id) REFERENCES sub_tasks(id) ON DELETE CASCADE
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_time_logs_open_user
                ON time_logs(user_id) WHERE end_time IS NULL;
            CREATE INDEX IF NOT EXISTS idx_time_logs_user_start
                ON time_logs(user_id, start_time);
            CREATE INDEX IF NOT EXISTS idx_time_logs_sub_task
                ON time_logs(sub_task_id);

            -- work_days: JSON array of weekday indices used for monthly
            -- salary pro-ration.
            CREATE TABLE IF NOT EXISTS employees (
                id TEXT PRIMARY KEY,
                company_id TEXT NOT NULL,
                name TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                pay_kind TEXT NOT NULL,
                hourly_rate REAL NOT NULL DEFAULT 0,
                monthly_salary REAL NOT NULL DEFAULT 0,
                currency TEXT NOT NULL DEFAULT 'USD',
                work_days TEXT NOT NULL DEFAULT '[1,2,3,4,5]'
            );

            CREATE INDEX IF NOT EXISTS idx_employees_company
                ON employees(company_id, active);

            CREATE TABLE IF NOT EXISTS pay_adjustments (
                user_id TEXT NOT NULL,
                period_start TEXT NOT NULL,
                overtime_hours REAL NOT NULL DEFAULT 0,
                overtime_pay REAL NOT NULL DEFAULT 0,
                leave_days REAL NOT NULL DEFAULT 0,
                leave_pay REAL NOT NULL DEFAULT 0,
                penalty_amount REAL NOT NULL DEFAULT 0,
                PRIMARY KEY (user_id, period_start)
            );

            -- Proof-of-work metadata captured by complete and auto-stop.
            CREATE TABLE IF NOT EXISTS work_proofs (
                id TEXT PRIMARY KEY,
                sub_task_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                reason TEXT NOT NULL,
                comment TEXT,
                attachments TEXT NOT NULL DEFAULT '[]',
                created_at TEXT NOT NULL,
                FOREIGN KEY (sub_task_id) REFERENCES sub_tasks(id) ON DELETE CASCADE
            );
            ",
        )?;
        Ok(())
    }

    /// Applies one sync document from the administration system in a single
    /// transaction.
    ///
    /// Upserts by ID: definition fields are overwritten, ledger-owned fields
    /// (`status`, `total_seconds`) are left untouched on conflict.
    pub fn apply_import(
        &mut self,
        batch: &ImportBatch,
        now: DateTime<Utc>,
    ) -> Result<ImportStats, DbError> {
        let tx = self.conn.transaction()?;
        for task in &batch.tasks {
            upsert_task(&tx, task)?;
        }
        for def in &batch.sub_tasks {
            upsert_sub_task(&tx, def, now)?;
        }
        for employee in &batch.employees {
            upsert_employee(&tx, employee)?;
        }
        for record in &batch.adjustments {
            upsert_adjustment(&tx, record)?;
        }
        tx.commit()?;
        Ok(ImportStats {
            tasks: batch.tasks.len(),
            sub_tasks: batch.sub_tasks.len(),
            employees: batch.employees.len(),
            adjustments: batch.adjustments.len(),
        })
    }

    /// Fetches a task by ID.
    pub fn get_task(&self, id: &TaskId) -> Result<Option<Task>, DbError> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, company_id, name FROM tasks WHERE id = ?",
                [id.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;
        raw.map(|(id, company_id, name)| {
            Ok(Task {
                id: TaskId::new(&id).map_err(|e| invalid_row("tasks", &id, e))?,
                company_id: CompanyId::new(&company_id)
                    .map_err(|e| invalid_row("tasks", &id, e))?,
                name,
            })
        })
        .transpose()
    }

    /// Fetches a sub-task by ID.
    pub fn get_sub_task(&self, id: &SubTaskId) -> Result<Option<SubTask>, DbError> {
        let raw = self
            .conn
            .query_row(
                &format!("{SUB_TASK_SELECT} WHERE id = ?"),
                [id.as_str()],
                RawSubTask::from_row,
            )
            .optional()?;
        raw.map(RawSubTask::into_domain).transpose()
    }

    /// Lists all sub-tasks for a task, ordered by ID.
    pub fn list_sub_tasks(&self, task_id: &TaskId) -> Result<Vec<SubTask>, DbError> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SUB_TASK_SELECT} WHERE task_id = ? ORDER BY id ASC"))?;
        let rows = stmt.query_map([task_id.as_str()], RawSubTask::from_row)?;
        let mut sub_tasks = Vec::new();
        for row in rows {
            sub_tasks.push(row?.into_domain()?);
        }
        Ok(sub_tasks)
    }

    /// Fetches an employee with compensation configuration.
    pub fn get_employee(&self, id: &UserId) -> Result<Option<Employee>, DbError> {
        let raw = self
            .conn
            .query_row(
                "
                SELECT id, company_id, name, active, pay_kind, hourly_rate,
                       monthly_salary, currency, work_days
                FROM employees
                WHERE id = ?
                ",
                [id.as_str()],
                RawEmployee::from_row,
            )
            .optional()?;
        raw.map(RawEmployee::into_domain).transpose()
    }

    /// Lists active employees of a company, ordered by ID.
    ///
    /// Deliberately reads only the ID and currency so a malformed
    /// compensation row cannot fail the listing — per-employee failures are
    /// handled downstream by substituting zero snapshots.
    pub fn list_active_employees(
        &self,
        company_id: &CompanyId,
    ) -> Result<Vec<ActiveEmployee>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, currency
            FROM employees
            WHERE company_id = ? AND active = 1
            ORDER BY id ASC
            ",
        )?;
        let rows = stmt.query_map([company_id.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut employees = Vec::new();
        for row in rows {
            let (id, currency) = row?;
            employees.push(ActiveEmployee {
                id: UserId::new(&id).map_err(|e| invalid_row("employees", &id, e))?,
                currency,
            });
        }
        Ok(employees)
    }

    /// Ledger overview counts.
    pub fn summary(&self) -> Result<LedgerSummary, DbError> {
        let count = |sql: &str| -> Result<usize, rusqlite::Error> {
            self.conn.query_row(sql, [], |row| row.get::<_, i64>(0)).map(
                |n| usize::try_from(n).unwrap_or(0),
            )
        };
        Ok(LedgerSummary {
            tasks: count("SELECT COUNT(*) FROM tasks")?,
            sub_tasks: count("SELECT COUNT(*) FROM sub_tasks")?,
            employees: count("SELECT COUNT(*) FROM employees")?,
            open_sessions: count("SELECT COUNT(*) FROM time_logs WHERE end_time IS NULL")?,
            closed_entries: count("SELECT COUNT(*) FROM time_logs WHERE end_time IS NOT NULL")?,
        })
    }
}

const SUB_TASK_SELECT: &str = "
    SELECT id, task_id, name, billing_mode, fixed_price, hourly_rate,
           estimated_hours, schedule_start, schedule_end, schedule_days,
           status, total_seconds, created_at, updated_at
    FROM sub_tasks
";

fn upsert_task(tx: &Transaction<'_>, task: &Task) -> Result<(), rusqlite::Error> {
    tx.execute(
        "
        INSERT INTO tasks (id, company_id, name)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            company_id = excluded.company_id,
            name = excluded.name
        ",
        params![task.id.as_str(), task.company_id.as_str(), task.name],
    )?;
    Ok(())
}

fn upsert_sub_task(
    tx: &Transaction<'_>,
    def: &SubTaskDef,
    now: DateTime<Utc>,
) -> Result<(), rusqlite::Error> {
    let days = serde_json::to_string(&def.schedule.days).unwrap_or_else(|_| "[]".to_string());
    let now = format_timestamp(now);
    tx.execute(
        "
        INSERT INTO sub_tasks
        (id, task_id, name, billing_mode, fixed_price, hourly_rate,
         estimated_hours, schedule_start, schedule_end, schedule_days,
         status, total_seconds, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', 0, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            task_id = excluded.task_id,
            name = excluded.name,
            billing_mode = excluded.billing_mode,
            fixed_price = excluded.fixed_price,
            hourly_rate = excluded.hourly_rate,
            estimated_hours = excluded.estimated_hours,
            schedule_start = excluded.schedule_start,
            schedule_end = excluded.schedule_end,
            schedule_days = excluded.schedule_days,
            updated_at = excluded.updated_at
        ",
        params![
            def.id.as_str(),
            def.task_id.as_str(),
            def.name,
            def.billing_mode.as_str(),
            def.fixed_price,
            def.hourly_rate,
            def.estimated_hours,
            def.schedule.start_time.map(format_time),
            def.schedule.end_time.map(format_time),
            days,
            now,
            now,
        ],
    )?;
    Ok(())
}

fn upsert_employee(tx: &Transaction<'_>, employee: &Employee) -> Result<(), rusqlite::Error> {
    let (hourly_rate, monthly_salary) = match employee.compensation.basis {
        PayBasis::Hourly { rate } => (rate, 0.0),
        PayBasis::Monthly { salary } => (0.0, salary),
    };
    let work_days = serde_json::to_string(&employee.compensation.work_days)
        .unwrap_or_else(|_| "[]".to_string());
    tx.execute(
        "
        INSERT INTO employees
        (id, company_id, name, active, pay_kind, hourly_rate, monthly_salary,
         currency, work_days)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            company_id = excluded.company_id,
            name = excluded.name,
            active = excluded.active,
            pay_kind = excluded.pay_kind,
            hourly_rate = excluded.hourly_rate,
            monthly_salary = excluded.monthly_salary,
            currency = excluded.currency,
            work_days = excluded.work_days
        ",
        params![
            employee.id.as_str(),
            employee.company_id.as_str(),
            employee.name,
            employee.active,
            employee.compensation.basis.kind().as_str(),
            hourly_rate,
            monthly_salary,
            employee.compensation.currency,
            work_days,
        ],
    )?;
    Ok(())
}

fn upsert_adjustment(tx: &Transaction<'_>, record: &AdjustmentRecord) -> Result<(), rusqlite::Error> {
    tx.execute(
        "
        INSERT INTO pay_adjustments
        (user_id, period_start, overtime_hours, overtime_pay, leave_days,
         leave_pay, penalty_amount)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(user_id, period_start) DO UPDATE SET
            overtime_hours = excluded.overtime_hours,
            overtime_pay = excluded.overtime_pay,
            leave_days = excluded.leave_days,
            leave_pay = excluded.leave_pay,
            penalty_amount = excluded.penalty_amount
        ",
        params![
            record.user_id.as_str(),
            format_timestamp(record.period_start),
            record.adjustments.overtime_hours,
            record.adjustments.overtime_pay,
            record.adjustments.leave_days,
            record.adjustments.leave_pay,
            record.adjustments.penalty_amount,
        ],
    )?;
    Ok(())
}

/// A raw sub-task row before domain conversion.
#[derive(Debug)]
struct RawSubTask {
    id: String,
    task_id: String,
    name: String,
    billing_mode: String,
    fixed_price: Option<f64>,
    hourly_rate: Option<f64>,
    estimated_hours: Option<f64>,
    schedule_start: Option<String>,
    schedule_end: Option<String>,
    schedule_days: String,
    status: String,
    total_seconds: i64,
    created_at: String,
    updated_at: String,
}

impl RawSubTask {
    fn from_row(row: &rusqlite::Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            task_id: row.get(1)?,
            name: row.get(2)?,
            billing_mode: row.get(3)?,
            fixed_price: row.get(4)?,
            hourly_rate: row.get(5)?,
            estimated_hours: row.get(6)?,
            schedule_start: row.get(7)?,
            schedule_end: row.get(8)?,
            schedule_days: row.get(9)?,
            status: row.get(10)?,
            total_seconds: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn into_domain(self) -> Result<SubTask, DbError> {
        let table = "sub_tasks";
        let days: Vec<u8> = serde_json::from_str(&self.schedule_days)
            .map_err(|e| invalid_row(table, &self.id, e))?;
        Ok(SubTask {
            task_id: TaskId::new(&self.task_id).map_err(|e| invalid_row(table, &self.id, e))?,
            name: self.name,
            billing_mode: self
                .billing_mode
                .parse()
                .map_err(|e| invalid_row(table, &self.id, e))?,
            fixed_price: self.fixed_price,
            hourly_rate: self.hourly_rate,
            estimated_hours: self.estimated_hours,
            schedule: Schedule {
                start_time: parse_opt_time(table, &self.id, self.schedule_start.as_deref())?,
                end_time: parse_opt_time(table, &self.id, self.schedule_end.as_deref())?,
                days,
            },
            status: self
                .status
                .parse()
                .map_err(|e| invalid_row(table, &self.id, e))?,
            total_seconds: self.total_seconds,
            created_at: parse_timestamp(table, &self.id, &self.created_at)?,
            updated_at: parse_timestamp(table, &self.id, &self.updated_at)?,
            id: SubTaskId::new(&self.id).map_err(|e| invalid_row(table, &self.id, e))?,
        })
    }
}

/// A raw employee row before domain conversion.
#[derive(Debug)]
struct RawEmployee {
    id: String,
    company_id: String,
    name: String,
    active: bool,
    pay_kind: String,
    hourly_rate: f64,
    monthly_salary: f64,
    currency: String,
    work_days: String,
}

impl RawEmployee {
    fn from_row(row: &rusqlite::Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            company_id: row.get(1)?,
            name: row.get(2)?,
            active: row.get(3)?,
            pay_kind: row.get(4)?,
            hourly_rate: row.get(5)?,
            monthly_salary: row.get(6)?,
            currency: row.get(7)?,
            work_days: row.get(8)?,
        })
    }

    fn into_domain(self) -> Result<Employee, DbError> {
        let table = "employees";
        let kind: PayKind = self
            .pay_kind
            .parse()
            .map_err(|e| invalid_row(table, &self.id, e))?;
        let basis = match kind {
            PayKind::Hourly => PayBasis::Hourly {
                rate: self.hourly_rate,
            },
            PayKind::Monthly => PayBasis::Monthly {
                salary: self.monthly_salary,
            },
        };
        let work_days: Vec<u8> = serde_json::from_str(&self.work_days)
            .map_err(|e| invalid_row(table, &self.id, e))?;
        let work_days = if work_days.is_empty() {
            Compensation::default_work_days()
        } else {
            work_days
        };
        Ok(Employee {
            company_id: CompanyId::new(&self.company_id)
                .map_err(|e| invalid_row(table, &self.id, e))?,
            name: self.name,
            active: self.active,
            compensation: Compensation {
                basis,
                currency: self.currency,
                work_days,
            },
            id: UserId::new(&self.id).map_err(|e| invalid_row(table, &self.id, e))?,
        })
    }
}

/// Formats a timestamp for storage (ISO 8601, UTC, second precision).
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub(crate) fn parse_timestamp(
    table: &'static str,
    id: &str,
    value: &str,
) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            table,
            id: id.to_string(),
            value: value.to_string(),
            source,
        })
}

/// Formats a time-of-day for storage (`HH:MM:SS`).
pub(crate) fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

fn parse_opt_time(
    table: &'static str,
    id: &str,
    value: Option<&str>,
) -> Result<Option<NaiveTime>, DbError> {
    value
        .map(|s| {
            NaiveTime::parse_from_str(s, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .map_err(|e| invalid_row(table, id, e))
        })
        .transpose()
}
