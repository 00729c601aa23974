//! Transactional session operations over the time-log ledger.
//!
//! This module owns the core correctness property of the system: for any
//! user, at most one time-log entry is open at any instant. The invariant is
//! actively maintained, not merely checked — starting a timer closes any
//! prior open entry inside the same transaction that opens the new one, so
//! no concurrent reader ever observes two open entries or a half-applied
//! close.
//!
//! Expected outcomes (`ScheduleLocked`, `NoActiveSession`, …) are error-enum
//! variants with structured payloads, not exceptions: callers render them as
//! normal responses. Transient transaction conflicts are retried exactly
//! once before surfacing as [`SessionError::Conflict`].

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde::Serialize;
use thiserror::Error;

use punch_core::schedule::WindowEval;
use punch_core::types::{SubTaskId, UserId};
use punch_core::{DomainEvent, StopReason, SubTask, TimeLogEntry};

use crate::{Database, DbError, format_timestamp, invalid_row, parse_timestamp};

/// The instant an operation happens at.
///
/// `utc` stamps the ledger; `wall` is the wall-clock time the schedule
/// window is evaluated against. Passing both explicitly keeps every
/// invariant testable without touching the system clock.
#[derive(Debug, Clone, Copy)]
pub struct OpTime {
    pub utc: DateTime<Utc>,
    pub wall: NaiveDateTime,
}

impl OpTime {
    /// An operation time whose wall clock is the UTC wall clock.
    #[must_use]
    pub fn from_utc(utc: DateTime<Utc>) -> Self {
        Self {
            utc,
            wall: utc.naive_utc(),
        }
    }

    /// The current instant, with the local wall clock for schedule gating.
    #[must_use]
    pub fn now() -> Self {
        Self {
            utc: Utc::now(),
            wall: Local::now().naive_local(),
        }
    }
}

/// Session operation errors.
///
/// `ScheduleLocked`, `NoActiveSession`, and `AlreadyCompleted` are expected,
/// user-facing conditions; the rest are server-side failures. [`Self::status`]
/// documents the REST mapping for transport adapters.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("sub-task not found: {0}")]
    SubTaskNotFound(SubTaskId),
    #[error("user not found: {0}")]
    UserNotFound(UserId),
    #[error("user {user_id} has no access to sub-task {sub_task_id}")]
    Unauthorized {
        user_id: UserId,
        sub_task_id: SubTaskId,
    },
    /// The schedule evaluator rejected the start. Carries the full
    /// evaluation so clients can render a structured countdown.
    #[error("schedule is locked: {}", .eval.reason.map_or_else(|| "window closed".to_string(), |reason| reason.to_string()))]
    ScheduleLocked { eval: WindowEval },
    #[error("sub-task already completed: {0}")]
    AlreadyCompleted(SubTaskId),
    #[error("no active session for user {user_id} on sub-task {sub_task_id}")]
    NoActiveSession {
        user_id: UserId,
        sub_task_id: SubTaskId,
    },
    #[error("storage error: {0}")]
    Storage(#[from] DbError),
    /// A transaction conflict persisted after the single transparent retry.
    /// The caller must not assume partial state changes occurred.
    #[error("transaction conflict persisted after retry: {0}")]
    Conflict(#[source] rusqlite::Error),
}

impl From<rusqlite::Error> for SessionError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(err))
    }
}

impl SessionError {
    /// HTTP status a transport adapter should map this error to.
    #[must_use]
    pub const fn status(&self) -> u16 {
        match self {
            Self::SubTaskNotFound(_) | Self::UserNotFound(_) => 404,
            Self::Unauthorized { .. } => 401,
            Self::ScheduleLocked { .. } => 403,
            Self::AlreadyCompleted(_) | Self::NoActiveSession { .. } => 400,
            Self::Storage(_) => 500,
            Self::Conflict(_) => 503,
        }
    }

    fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(DbError::Sqlite(err)) if is_busy(err))
    }
}

fn is_busy(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
    )
}

/// A session that was auto-paused to admit a new start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoppedSession {
    pub sub_task_id: SubTaskId,
    pub duration_seconds: i64,
}

/// Result of a successful start.
#[derive(Debug, Clone)]
pub struct StartOutcome {
    /// The newly opened ledger entry.
    pub log: TimeLogEntry,
    /// The started sub-task, refreshed after the transaction.
    pub sub_task: SubTask,
    /// The previously open session, when one was auto-paused.
    pub stopped: Option<StoppedSession>,
    /// Events for the caller to publish.
    pub events: Vec<DomainEvent>,
}

/// Result of a successful stop or auto-stop.
#[derive(Debug, Clone)]
pub struct StopOutcome {
    pub sub_task: SubTask,
    pub duration_seconds: i64,
    pub events: Vec<DomainEvent>,
}

/// Result of a successful completion.
#[derive(Debug, Clone)]
pub struct CompleteOutcome {
    pub sub_task: SubTask,
    /// Duration of the session closed by completion, when one was open.
    pub closed_duration_seconds: Option<i64>,
    pub events: Vec<DomainEvent>,
}

/// The user's single open session, joined with its sub-task.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveSession {
    pub log: TimeLogEntry,
    pub sub_task: SubTask,
    /// Live `now - start_time`.
    pub elapsed_seconds: i64,
}

/// Optional proof-of-work metadata for complete and auto-stop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProofOfWork {
    pub comment: Option<String>,
    pub attachments: Vec<String>,
}

impl Database {
    /// Starts tracking `sub_task_id` for `user_id`.
    ///
    /// Gated by the schedule evaluator and the sub-task's status. As a
    /// single atomic unit: closes the user's prior open entry (crediting its
    /// sub-task and flipping it back to pending), opens a new entry, and
    /// marks the sub-task in-progress.
    pub fn start_session(
        &mut self,
        sub_task_id: &SubTaskId,
        user_id: &UserId,
        at: OpTime,
    ) -> Result<StartOutcome, SessionError> {
        let sub_task = self.authorize(sub_task_id, user_id)?;
        if sub_task.status.is_terminal() {
            return Err(SessionError::AlreadyCompleted(sub_task_id.clone()));
        }
        let eval = sub_task.evaluate_window(at.wall);
        if !eval.can_start {
            return Err(SessionError::ScheduleLocked { eval });
        }

        let log_id = uuid::Uuid::new_v4().to_string();
        let raw_stopped =
            self.with_retry(|conn| start_txn(conn, sub_task_id, user_id, &log_id, at.utc))?;

        let stopped = raw_stopped
            .map(|(stopped_id, duration_seconds)| {
                let sub_task_id = SubTaskId::new(&stopped_id)
                    .map_err(|e| invalid_row("time_logs", &stopped_id, e))?;
                Ok::<_, DbError>(StoppedSession {
                    sub_task_id,
                    duration_seconds,
                })
            })
            .transpose()?;

        let sub_task = self
            .get_sub_task(sub_task_id)?
            .ok_or_else(|| SessionError::SubTaskNotFound(sub_task_id.clone()))?;
        let log = TimeLogEntry {
            id: log_id,
            user_id: user_id.clone(),
            sub_task_id: sub_task_id.clone(),
            start_time: at.utc,
            end_time: None,
            duration_seconds: None,
        };

        let mut events = vec![DomainEvent::SubTaskStarted {
            sub_task_id: sub_task_id.clone(),
            task_id: sub_task.task_id.clone(),
            user_id: user_id.clone(),
            stopped_sub_task_id: stopped.as_ref().map(|s| s.sub_task_id.clone()),
        }];
        if stopped.is_some() {
            // The auto-paused sub-task accumulated seconds.
            events.push(DomainEvent::EarningsUpdated {
                user_id: user_id.clone(),
            });
        }

        tracing::debug!(
            sub_task = %sub_task_id,
            user = %user_id,
            auto_paused = stopped.is_some(),
            "session started"
        );
        Ok(StartOutcome {
            log,
            sub_task,
            stopped,
            events,
        })
    }

    /// Stops the user's open session on `sub_task_id`.
    ///
    /// Fails with [`SessionError::NoActiveSession`] when nothing is open for
    /// that (user, sub-task) pair.
    pub fn stop_session(
        &mut self,
        sub_task_id: &SubTaskId,
        user_id: &UserId,
        at: OpTime,
    ) -> Result<StopOutcome, SessionError> {
        self.authorize(sub_task_id, user_id)?;
        let duration_seconds = self
            .with_retry(|conn| stop_txn(conn, sub_task_id, user_id, at.utc, None))?
            .ok_or_else(|| SessionError::NoActiveSession {
                user_id: user_id.clone(),
                sub_task_id: sub_task_id.clone(),
            })?;
        let sub_task = self
            .get_sub_task(sub_task_id)?
            .ok_or_else(|| SessionError::SubTaskNotFound(sub_task_id.clone()))?;
        tracing::debug!(sub_task = %sub_task_id, user = %user_id, duration_seconds, "session stopped");
        Ok(StopOutcome {
            sub_task,
            duration_seconds,
            events: vec![DomainEvent::EarningsUpdated {
                user_id: user_id.clone(),
            }],
        })
    }

    /// Stops a session on behalf of the scheduling collaborator when a
    /// window closes.
    ///
    /// Same accounting as [`Self::stop_session`]; distinguished in emitted
    /// events by the `scheduled_end` reason and an optional proof-of-work
    /// payload.
    pub fn auto_stop_session(
        &mut self,
        sub_task_id: &SubTaskId,
        user_id: &UserId,
        proof: Option<&ProofOfWork>,
        at: OpTime,
    ) -> Result<StopOutcome, SessionError> {
        self.authorize(sub_task_id, user_id)?;
        let duration_seconds = self
            .with_retry(|conn| {
                stop_txn(
                    conn,
                    sub_task_id,
                    user_id,
                    at.utc,
                    proof.map(|p| (p, StopReason::ScheduledEnd)),
                )
            })?
            .ok_or_else(|| SessionError::NoActiveSession {
                user_id: user_id.clone(),
                sub_task_id: sub_task_id.clone(),
            })?;
        let sub_task = self
            .get_sub_task(sub_task_id)?
            .ok_or_else(|| SessionError::SubTaskNotFound(sub_task_id.clone()))?;
        tracing::debug!(sub_task = %sub_task_id, user = %user_id, duration_seconds, "session auto-stopped");
        Ok(StopOutcome {
            events: vec![
                DomainEvent::SubTaskAutoStopped {
                    sub_task_id: sub_task_id.clone(),
                    task_id: sub_task.task_id.clone(),
                    user_id: user_id.clone(),
                    duration_seconds,
                    reason: StopReason::ScheduledEnd,
                },
                DomainEvent::EarningsUpdated {
                    user_id: user_id.clone(),
                },
            ],
            sub_task,
            duration_seconds,
        })
    }

    /// Completes a sub-task.
    ///
    /// Closes an open session for the pair first when one exists (same
    /// accounting as stop), then unconditionally marks the sub-task
    /// completed — calling this with nothing open is not an error.
    pub fn complete_sub_task(
        &mut self,
        sub_task_id: &SubTaskId,
        user_id: &UserId,
        proof: Option<&ProofOfWork>,
        at: OpTime,
    ) -> Result<CompleteOutcome, SessionError> {
        self.authorize(sub_task_id, user_id)?;
        let closed_duration_seconds =
            self.with_retry(|conn| complete_txn(conn, sub_task_id, user_id, at.utc, proof))?;
        let sub_task = self
            .get_sub_task(sub_task_id)?
            .ok_or_else(|| SessionError::SubTaskNotFound(sub_task_id.clone()))?;

        let mut events = vec![DomainEvent::SubTaskCompleted {
            sub_task_id: sub_task_id.clone(),
            task_id: sub_task.task_id.clone(),
            user_id: user_id.clone(),
            duration_seconds: closed_duration_seconds,
        }];
        if closed_duration_seconds.is_some() {
            events.push(DomainEvent::EarningsUpdated {
                user_id: user_id.clone(),
            });
        }

        tracing::debug!(sub_task = %sub_task_id, user = %user_id, "sub-task completed");
        Ok(CompleteOutcome {
            sub_task,
            closed_duration_seconds,
            events,
        })
    }

    /// Returns the user's single open session, if any, with live elapsed
    /// seconds. Read-only: never mutates ledger state.
    pub fn active_session(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<ActiveSession>, SessionError> {
        if self.get_employee(user_id)?.is_none() {
            return Err(SessionError::UserNotFound(user_id.clone()));
        }
        let Some(open) = find_open_log(&self.conn, user_id.as_str())? else {
            return Ok(None);
        };
        let sub_task_id = SubTaskId::new(&open.sub_task_id)
            .map_err(|e| invalid_row("time_logs", &open.id, e))?;
        let sub_task = self
            .get_sub_task(&sub_task_id)?
            .ok_or_else(|| SessionError::SubTaskNotFound(sub_task_id.clone()))?;
        let start_time = parse_timestamp("time_logs", &open.id, &open.start_time)?;
        let log = TimeLogEntry {
            id: open.id,
            user_id: user_id.clone(),
            sub_task_id,
            start_time,
            end_time: None,
            duration_seconds: None,
        };
        let elapsed_seconds = log.elapsed_seconds(now);
        Ok(Some(ActiveSession {
            log,
            sub_task,
            elapsed_seconds,
        }))
    }

    /// Identity and tenancy checks shared by every session operation.
    fn authorize(
        &self,
        sub_task_id: &SubTaskId,
        user_id: &UserId,
    ) -> Result<SubTask, SessionError> {
        let employee = self
            .get_employee(user_id)?
            .ok_or_else(|| SessionError::UserNotFound(user_id.clone()))?;
        let sub_task = self
            .get_sub_task(sub_task_id)?
            .ok_or_else(|| SessionError::SubTaskNotFound(sub_task_id.clone()))?;
        let task = self
            .get_task(&sub_task.task_id)?
            .ok_or_else(|| SessionError::SubTaskNotFound(sub_task_id.clone()))?;
        if task.company_id != employee.company_id {
            return Err(SessionError::Unauthorized {
                user_id: user_id.clone(),
                sub_task_id: sub_task_id.clone(),
            });
        }
        Ok(sub_task)
    }

    /// Runs a transactional operation, retrying once on a transient
    /// conflict (`SQLITE_BUSY` / `SQLITE_LOCKED`).
    fn with_retry<T>(
        &mut self,
        op: impl Fn(&mut Connection) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        match op(&mut self.conn) {
            Err(err) if err.is_transient() => {
                tracing::warn!(error = %err, "transaction conflict, retrying once");
                op(&mut self.conn).map_err(|retry_err| match retry_err {
                    SessionError::Storage(DbError::Sqlite(inner)) if is_busy(&inner) => {
                        SessionError::Conflict(inner)
                    }
                    other => other,
                })
            }
            result => result,
        }
    }
}

/// An open ledger row as stored.
struct OpenLog {
    id: String,
    sub_task_id: String,
    start_time: String,
}

fn find_open_log(conn: &Connection, user_id: &str) -> Result<Option<OpenLog>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, sub_task_id, start_time FROM time_logs WHERE user_id = ? AND end_time IS NULL",
        [user_id],
        |row| {
            Ok(OpenLog {
                id: row.get(0)?,
                sub_task_id: row.get(1)?,
                start_time: row.get(2)?,
            })
        },
    )
    .optional()
}

fn find_open_log_for(
    conn: &Connection,
    user_id: &str,
    sub_task_id: &str,
) -> Result<Option<OpenLog>, rusqlite::Error> {
    conn.query_row(
        "
        SELECT id, sub_task_id, start_time
        FROM time_logs
        WHERE user_id = ? AND sub_task_id = ? AND end_time IS NULL
        ",
        [user_id, sub_task_id],
        |row| {
            Ok(OpenLog {
                id: row.get(0)?,
                sub_task_id: row.get(1)?,
                start_time: row.get(2)?,
            })
        },
    )
    .optional()
}

/// Closes an open entry and credits its sub-task.
///
/// Sets `end_time`/`duration_seconds` on the entry, adds the duration to the
/// sub-task's `total_seconds`, and flips the sub-task back to pending.
fn close_open_log(
    tx: &Transaction<'_>,
    open: &OpenLog,
    now: DateTime<Utc>,
) -> Result<i64, SessionError> {
    let started = parse_timestamp("time_logs", &open.id, &open.start_time)?;
    let duration = (now - started).num_seconds().max(0);
    tx.execute(
        "UPDATE time_logs SET end_time = ?, duration_seconds = ? WHERE id = ?",
        params![format_timestamp(now), duration, open.id],
    )?;
    tx.execute(
        "
        UPDATE sub_tasks
        SET total_seconds = total_seconds + ?, status = 'pending', updated_at = ?
        WHERE id = ?
        ",
        params![duration, format_timestamp(now), open.sub_task_id],
    )?;
    Ok(duration)
}

fn insert_proof(
    tx: &Transaction<'_>,
    sub_task_id: &SubTaskId,
    user_id: &UserId,
    reason: &str,
    proof: &ProofOfWork,
    now: DateTime<Utc>,
) -> Result<(), SessionError> {
    let attachments =
        serde_json::to_string(&proof.attachments).unwrap_or_else(|_| "[]".to_string());
    tx.execute(
        "
        INSERT INTO work_proofs (id, sub_task_id, user_id, reason, comment, attachments, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ",
        params![
            uuid::Uuid::new_v4().to_string(),
            sub_task_id.as_str(),
            user_id.as_str(),
            reason,
            proof.comment,
            attachments,
            format_timestamp(now),
        ],
    )?;
    Ok(())
}

fn start_txn(
    conn: &mut Connection,
    sub_task_id: &SubTaskId,
    user_id: &UserId,
    log_id: &str,
    now: DateTime<Utc>,
) -> Result<Option<(String, i64)>, SessionError> {
    let tx = conn.transaction()?;
    let stopped = match find_open_log(&tx, user_id.as_str())? {
        Some(open) => {
            let duration = close_open_log(&tx, &open, now)?;
            Some((open.sub_task_id, duration))
        }
        None => None,
    };
    tx.execute(
        "INSERT INTO time_logs (id, user_id, sub_task_id, start_time) VALUES (?, ?, ?, ?)",
        params![
            log_id,
            user_id.as_str(),
            sub_task_id.as_str(),
            format_timestamp(now)
        ],
    )?;
    tx.execute(
        "UPDATE sub_tasks SET status = 'in_progress', updated_at = ? WHERE id = ?",
        params![format_timestamp(now), sub_task_id.as_str()],
    )?;
    tx.commit()?;
    Ok(stopped)
}

fn stop_txn(
    conn: &mut Connection,
    sub_task_id: &SubTaskId,
    user_id: &UserId,
    now: DateTime<Utc>,
    proof: Option<(&ProofOfWork, StopReason)>,
) -> Result<Option<i64>, SessionError> {
    let tx = conn.transaction()?;
    let Some(open) = find_open_log_for(&tx, user_id.as_str(), sub_task_id.as_str())? else {
        return Ok(None);
    };
    let duration = close_open_log(&tx, &open, now)?;
    if let Some((proof, reason)) = proof {
        insert_proof(&tx, sub_task_id, user_id, reason.as_str(), proof, now)?;
    }
    tx.commit()?;
    Ok(Some(duration))
}

fn complete_txn(
    conn: &mut Connection,
    sub_task_id: &SubTaskId,
    user_id: &UserId,
    now: DateTime<Utc>,
    proof: Option<&ProofOfWork>,
) -> Result<Option<i64>, SessionError> {
    let tx = conn.transaction()?;
    let closed = match find_open_log_for(&tx, user_id.as_str(), sub_task_id.as_str())? {
        Some(open) => Some(close_open_log(&tx, &open, now)?),
        None => None,
    };
    tx.execute(
        "UPDATE sub_tasks SET status = 'completed', updated_at = ? WHERE id = ?",
        params![format_timestamp(now), sub_task_id.as_str()],
    )?;
    if let Some(proof) = proof {
        insert_proof(&tx, sub_task_id, user_id, "completed", proof, now)?;
    }
    tx.commit()?;
    Ok(closed)
}
