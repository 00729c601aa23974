//! Core domain logic for the punch time tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Schedule evaluation: gating timer starts against recurring weekly windows
//! - Earnings: blending hourly pay, salary pro-ration, and pay adjustments
//! - Sub-task and time-log lifecycle types and budget derivation

pub mod earnings;
pub mod event;
pub mod schedule;
mod subtask;
pub mod types;

pub use earnings::{
    Compensation, EarningsSnapshot, PayAdjustments, PayBasis, PayKind, PayPeriod,
    compute_snapshot, hourly_amount, prorate_salary,
};
pub use event::{DomainEvent, StopReason};
pub use schedule::{
    DisplayStatus, LockReason, Schedule, ScheduleDisplay, WindowEval, evaluate, format_countdown,
};
pub use subtask::{SubTask, Task, TimeLogEntry};
pub use types::{
    BillingMode, CompanyId, SubTaskId, SubTaskStatus, TaskId, UserId, ValidationError,
};
