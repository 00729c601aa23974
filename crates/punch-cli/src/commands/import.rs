//! Import command for syncing definitions from the administration system.
//!
//! Company/user management lives in an external admin surface; this command
//! consumes its export — one JSON document on stdin with tasks, sub-tasks,
//! employees, and pay adjustments — and upserts it into the local store.

use std::io::{self, Read};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveTime, Utc};
use serde::Deserialize;

use punch_core::Task;
use punch_core::earnings::{Compensation, PayAdjustments, PayBasis, PayKind};
use punch_core::schedule::Schedule;
use punch_core::types::{CompanyId, SubTaskId, TaskId, UserId, validate_weekdays};
use punch_db::{AdjustmentRecord, Database, Employee, ImportBatch, SubTaskDef};

pub fn run(db: &mut Database) -> Result<()> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read stdin")?;
    let document: ImportDocument =
        serde_json::from_str(&input).context("invalid import document")?;
    let batch = document.into_batch()?;
    let stats = db.apply_import(&batch, Utc::now())?;
    println!(
        "Imported {} tasks, {} sub-tasks, {} employees, {} adjustments",
        stats.tasks, stats.sub_tasks, stats.employees, stats.adjustments
    );
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ImportDocument {
    #[serde(default)]
    tasks: Vec<TaskImport>,
    #[serde(default)]
    sub_tasks: Vec<SubTaskImport>,
    #[serde(default)]
    employees: Vec<EmployeeImport>,
    #[serde(default)]
    pay_adjustments: Vec<AdjustmentImport>,
}

impl ImportDocument {
    fn into_batch(self) -> Result<ImportBatch> {
        Ok(ImportBatch {
            tasks: self
                .tasks
                .into_iter()
                .map(TaskImport::into_task)
                .collect::<Result<_>>()?,
            sub_tasks: self
                .sub_tasks
                .into_iter()
                .map(SubTaskImport::into_def)
                .collect::<Result<_>>()?,
            employees: self
                .employees
                .into_iter()
                .map(EmployeeImport::into_employee)
                .collect::<Result<_>>()?,
            adjustments: self
                .pay_adjustments
                .into_iter()
                .map(AdjustmentImport::into_record)
                .collect::<Result<_>>()?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TaskImport {
    id: String,
    company_id: String,
    name: String,
}

impl TaskImport {
    fn into_task(self) -> Result<Task> {
        Ok(Task {
            id: TaskId::new(self.id.as_str())
                .with_context(|| format!("invalid task ID: {:?}", self.id))?,
            company_id: CompanyId::new(self.company_id.as_str())
                .with_context(|| format!("invalid company for task {}", self.id))?,
            name: self.name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct SubTaskImport {
    id: String,
    task_id: String,
    name: String,
    billing_mode: String,
    #[serde(default)]
    fixed_price: Option<f64>,
    #[serde(default)]
    hourly_rate: Option<f64>,
    #[serde(default)]
    estimated_hours: Option<f64>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    schedule_days: Vec<u8>,
}

impl SubTaskImport {
    fn into_def(self) -> Result<SubTaskDef> {
        let days = validate_weekdays(&self.schedule_days)
            .with_context(|| format!("invalid schedule days for sub-task {}", self.id))?;
        Ok(SubTaskDef {
            id: SubTaskId::new(self.id.as_str())
                .with_context(|| format!("invalid sub-task ID: {:?}", self.id))?,
            task_id: TaskId::new(self.task_id.as_str())
                .with_context(|| format!("invalid task for sub-task {}", self.id))?,
            billing_mode: self
                .billing_mode
                .parse()
                .with_context(|| format!("invalid billing mode for sub-task {}", self.id))?,
            fixed_price: self.fixed_price,
            hourly_rate: self.hourly_rate,
            estimated_hours: self.estimated_hours,
            schedule: Schedule {
                start_time: parse_time(self.start_time.as_deref())
                    .with_context(|| format!("invalid start time for sub-task {}", self.id))?,
                end_time: parse_time(self.end_time.as_deref())
                    .with_context(|| format!("invalid end time for sub-task {}", self.id))?,
                days,
            },
            name: self.name,
        })
    }
}

#[derive(Debug, Deserialize)]
struct EmployeeImport {
    id: String,
    company_id: String,
    name: String,
    #[serde(default = "default_active")]
    active: bool,
    pay_kind: String,
    #[serde(default)]
    hourly_rate: f64,
    #[serde(default)]
    monthly_salary: f64,
    #[serde(default = "default_currency")]
    currency: String,
    #[serde(default)]
    work_days: Vec<u8>,
}

const fn default_active() -> bool {
    true
}

fn default_currency() -> String {
    "USD".to_string()
}

impl EmployeeImport {
    fn into_employee(self) -> Result<Employee> {
        let kind: PayKind = self
            .pay_kind
            .parse()
            .with_context(|| format!("invalid pay kind for employee {}", self.id))?;
        let basis = match kind {
            PayKind::Hourly => PayBasis::Hourly {
                rate: self.hourly_rate,
            },
            PayKind::Monthly => PayBasis::Monthly {
                salary: self.monthly_salary,
            },
        };
        let work_days = if self.work_days.is_empty() {
            Compensation::default_work_days()
        } else {
            validate_weekdays(&self.work_days)
                .with_context(|| format!("invalid work days for employee {}", self.id))?
        };
        Ok(Employee {
            id: UserId::new(self.id.as_str())
                .with_context(|| format!("invalid employee ID: {:?}", self.id))?,
            company_id: CompanyId::new(self.company_id.as_str())
                .with_context(|| format!("invalid company for employee {}", self.id))?,
            name: self.name,
            active: self.active,
            compensation: Compensation {
                basis,
                currency: self.currency,
                work_days,
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct AdjustmentImport {
    user_id: String,
    period_start: String,
    #[serde(default)]
    overtime_hours: f64,
    #[serde(default)]
    overtime_pay: f64,
    #[serde(default)]
    leave_days: f64,
    #[serde(default)]
    leave_pay: f64,
    #[serde(default)]
    penalty_amount: f64,
}

impl AdjustmentImport {
    fn into_record(self) -> Result<AdjustmentRecord> {
        let period_start = DateTime::parse_from_rfc3339(&self.period_start)
            .with_context(|| format!("invalid period_start for {}", self.user_id))?
            .with_timezone(&Utc);
        Ok(AdjustmentRecord {
            user_id: UserId::new(self.user_id.as_str())
                .with_context(|| format!("invalid user ID: {:?}", self.user_id))?,
            period_start,
            adjustments: PayAdjustments {
                overtime_hours: self.overtime_hours,
                overtime_pay: self.overtime_pay,
                leave_days: self.leave_days,
                leave_pay: self.leave_pay,
                penalty_amount: self.penalty_amount,
            },
        })
    }
}

fn parse_time(value: Option<&str>) -> Result<Option<NaiveTime>> {
    value
        .map(|s| {
            NaiveTime::parse_from_str(s, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
                .with_context(|| format!("invalid time of day: {s}"))
        })
        .transpose()
}
