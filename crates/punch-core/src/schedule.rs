//! Recurring schedule window evaluation.
//!
//! A `SCHEDULED` sub-task carries a weekly time window (start/end time-of-day
//! plus a set of weekday indices). [`evaluate`] answers whether a timer may
//! start right now and how far away the window boundary is, to single-second
//! precision — callers display live countdowns from these numbers.
//!
//! Evaluation is pure: the caller supplies `now` as wall-clock time in
//! whatever timezone the schedule is expressed in.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::types::BillingMode;

/// Locked windows closer than this count as `starting_soon`.
const STARTING_SOON_SECONDS: i64 = 30 * 60;

/// Window end used when a schedule has a start time but no end time.
fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap()
}

/// A sub-task's recurring weekly window configuration.
///
/// A schedule with no `start_time` does not gate anything, regardless of the
/// other fields. An empty `days` set means every day is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schedule {
    /// Window opening time-of-day.
    pub start_time: Option<NaiveTime>,
    /// Window closing time-of-day. Defaults to 23:59 when unset.
    pub end_time: Option<NaiveTime>,
    /// Allowed weekday indices (0=Sunday … 6=Saturday). Empty = every day.
    #[serde(default)]
    pub days: Vec<u8>,
}

impl Schedule {
    /// A schedule that never gates starts.
    #[must_use]
    pub const fn unscheduled() -> Self {
        Self {
            start_time: None,
            end_time: None,
            days: Vec::new(),
        }
    }

    /// Whether this schedule has a configured window at all.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.start_time.is_some()
    }
}

/// Why a start was rejected by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LockReason {
    /// Today is not one of the scheduled weekdays.
    NotScheduledToday {
        /// Weekday index (0=Sunday) of the next allowed day.
        next_day: u8,
    },
    /// Today is scheduled but the window has not opened yet.
    BeforeStart { start: NaiveTime },
    /// The window already closed for today.
    AfterEnd { end: NaiveTime },
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotScheduledToday { next_day } => {
                write!(
                    f,
                    "not scheduled today; next window opens on {}",
                    weekday_name(*next_day)
                )
            }
            Self::BeforeStart { start } => {
                write!(f, "window opens at {}", start.format("%H:%M"))
            }
            Self::AfterEnd { end } => {
                write!(f, "window ended at {}", end.format("%H:%M"))
            }
        }
    }
}

/// Result of evaluating a schedule against an instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowEval {
    /// Whether a timer may start now.
    pub can_start: bool,
    /// Whether the sub-task is gated by a schedule at all.
    pub is_scheduled: bool,
    /// Whether `now` falls inside an allowed interval.
    pub is_active_window: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<LockReason>,
    /// Seconds until the next allowed start, when locked.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_in_seconds: Option<i64>,
    /// Seconds until the current window closes, when active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_in_seconds: Option<i64>,
}

impl WindowEval {
    /// An evaluation for a sub-task with no applicable schedule.
    const fn unscheduled() -> Self {
        Self {
            can_start: true,
            is_scheduled: false,
            is_active_window: false,
            reason: None,
            starts_in_seconds: None,
            ends_in_seconds: None,
        }
    }

    const fn locked(reason: LockReason, starts_in_seconds: i64) -> Self {
        Self {
            can_start: false,
            is_scheduled: true,
            is_active_window: false,
            reason: Some(reason),
            starts_in_seconds: Some(starts_in_seconds),
            ends_in_seconds: None,
        }
    }
}

/// Evaluates whether a timer may start or continue at `now`.
///
/// Scheduling only applies to [`BillingMode::Scheduled`] sub-tasks with a
/// configured start time; everything else can always start.
#[must_use]
pub fn evaluate(mode: BillingMode, schedule: &Schedule, now: NaiveDateTime) -> WindowEval {
    let Some(start) = schedule.start_time else {
        return WindowEval::unscheduled();
    };
    if mode != BillingMode::Scheduled {
        return WindowEval::unscheduled();
    }
    let end = schedule.end_time.unwrap_or_else(end_of_day);
    let today = today_index(now);

    if !schedule.days.is_empty() && !schedule.days.contains(&today) {
        let offset = next_scheduled_offset(today, &schedule.days);
        let target = future_day_start(now, offset, start);
        return WindowEval::locked(
            LockReason::NotScheduledToday {
                next_day: (today + offset) % 7,
            },
            seconds_until(now, target),
        );
    }

    if now.time() < start {
        let target = now.date().and_time(start);
        return WindowEval::locked(
            LockReason::BeforeStart { start },
            seconds_until(now, target),
        );
    }

    if now.time() > end {
        // The next start honors the scheduled days rather than assuming
        // tomorrow is allowed.
        let offset = next_scheduled_offset(today, &schedule.days);
        let target = future_day_start(now, offset, start);
        return WindowEval::locked(LockReason::AfterEnd { end }, seconds_until(now, target));
    }

    let closes = now.date().and_time(end);
    WindowEval {
        can_start: true,
        is_scheduled: true,
        is_active_window: true,
        reason: None,
        starts_in_seconds: None,
        ends_in_seconds: Some(seconds_until(now, closes)),
    }
}

/// Weekday index of `now` (0=Sunday … 6=Saturday).
fn today_index(now: NaiveDateTime) -> u8 {
    u8::try_from(now.weekday().num_days_from_sunday()).unwrap_or(0)
}

/// Smallest day offset (1..=7) from `today` to an allowed weekday.
///
/// An empty day set allows every day, so the offset is 1 (tomorrow). When
/// today itself is the only allowed day the offset wraps to 7 (same day
/// next week).
fn next_scheduled_offset(today: u8, days: &[u8]) -> u8 {
    if days.is_empty() {
        return 1;
    }
    (1..=7u8)
        .find(|d| days.contains(&((today + d) % 7)))
        .unwrap_or(7)
}

fn future_day_start(now: NaiveDateTime, offset_days: u8, start: NaiveTime) -> NaiveDateTime {
    (now.date() + Duration::days(i64::from(offset_days))).and_time(start)
}

fn seconds_until(now: NaiveDateTime, target: NaiveDateTime) -> i64 {
    (target - now).num_seconds()
}

/// Client-facing schedule status derived from an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    /// Locked, next start more than 30 minutes away.
    Locked,
    /// Locked, next start within 30 minutes.
    StartingSoon,
    /// The window is open.
    Active,
    /// The window closed for today.
    Ended,
    /// No schedule applies.
    NoSchedule,
}

impl DisplayStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::StartingSoon => "starting_soon",
            Self::Active => "active",
            Self::Ended => "ended",
            Self::NoSchedule => "no_schedule",
        }
    }
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display status plus a live `HH:MM:SS` countdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduleDisplay {
    pub status: DisplayStatus,
    /// Time to window end when active, time to next start otherwise.
    /// Absent when no schedule applies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown: Option<String>,
}

impl ScheduleDisplay {
    /// Derives the client-facing status from an evaluation.
    #[must_use]
    pub fn from_eval(eval: &WindowEval) -> Self {
        if !eval.is_scheduled {
            return Self {
                status: DisplayStatus::NoSchedule,
                countdown: None,
            };
        }
        if eval.is_active_window {
            return Self {
                status: DisplayStatus::Active,
                countdown: eval.ends_in_seconds.map(format_countdown),
            };
        }
        let status = match eval.reason {
            Some(LockReason::AfterEnd { .. }) => DisplayStatus::Ended,
            _ => {
                if eval.starts_in_seconds.unwrap_or(i64::MAX) <= STARTING_SOON_SECONDS {
                    DisplayStatus::StartingSoon
                } else {
                    DisplayStatus::Locked
                }
            }
        };
        Self {
            status,
            countdown: eval.starts_in_seconds.map(format_countdown),
        }
    }
}

/// Formats a second count as `HH:MM:SS`.
///
/// Hours are not capped at 24 — multi-day countdowns render as e.g.
/// `55:33:20`. Negative inputs render as `00:00:00`.
#[must_use]
pub fn format_countdown(total_seconds: i64) -> String {
    let total = total_seconds.max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

const fn weekday_name(day: u8) -> &'static str {
    match day {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        _ => "Saturday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32, ss: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, ss)
            .unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn nine_to_five(days: Vec<u8>) -> Schedule {
        Schedule {
            start_time: Some(hm(9, 0)),
            end_time: Some(hm(17, 0)),
            days,
        }
    }

    #[test]
    fn hourly_mode_never_gated() {
        let schedule = nine_to_five(vec![1, 2, 3]);
        let eval = evaluate(BillingMode::Hourly, &schedule, at(2026, 8, 3, 3, 0, 0));
        assert!(eval.can_start);
        assert!(!eval.is_scheduled);
        assert!(eval.reason.is_none());
    }

    #[test]
    fn scheduled_without_start_time_never_gated() {
        let schedule = Schedule {
            start_time: None,
            end_time: Some(hm(17, 0)),
            days: vec![1],
        };
        let eval = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 3, 0, 0));
        assert!(eval.can_start);
        assert!(!eval.is_scheduled);
    }

    #[test]
    fn sunday_night_wraps_to_monday_midnight() {
        // 2026-08-02 is a Sunday. Monday-only schedule starting at midnight:
        // 30 seconds before midnight the countdown is exactly 30 seconds.
        let schedule = Schedule {
            start_time: Some(hm(0, 0)),
            end_time: None,
            days: vec![1],
        };
        let eval = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 2, 23, 59, 30));
        assert!(!eval.can_start);
        assert_eq!(eval.starts_in_seconds, Some(30));
        assert_eq!(
            eval.reason,
            Some(LockReason::NotScheduledToday { next_day: 1 })
        );
    }

    #[test]
    fn lookahead_spans_multiple_days() {
        // 2026-08-05 is a Wednesday; Tuesday-only schedule means six days out.
        let schedule = nine_to_five(vec![2]);
        let eval = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 5, 10, 0, 0));
        assert!(!eval.can_start);
        assert_eq!(
            eval.reason,
            Some(LockReason::NotScheduledToday { next_day: 2 })
        );
        // Wed 10:00 -> Tue 09:00 = 5 days + 23 hours
        assert_eq!(eval.starts_in_seconds, Some(5 * 86_400 + 23 * 3_600));
    }

    #[test]
    fn week_wraps_past_saturday() {
        // 2026-08-01 is a Saturday; Sunday-only schedule opens tomorrow.
        let schedule = nine_to_five(vec![0]);
        let eval = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 1, 9, 30, 0));
        assert_eq!(
            eval.reason,
            Some(LockReason::NotScheduledToday { next_day: 0 })
        );
        // Sat 09:30 -> Sun 09:00 = 23.5 hours
        assert_eq!(eval.starts_in_seconds, Some(23 * 3_600 + 30 * 60));
    }

    #[test]
    fn before_start_counts_down_to_today() {
        // 2026-08-03 is a Monday.
        let schedule = nine_to_five(vec![1]);
        let eval = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 8, 59, 30));
        assert!(!eval.can_start);
        assert!(eval.is_scheduled);
        assert_eq!(eval.reason, Some(LockReason::BeforeStart { start: hm(9, 0) }));
        assert_eq!(eval.starts_in_seconds, Some(30));
    }

    #[test]
    fn active_window_counts_down_to_end() {
        let schedule = nine_to_five(vec![]);
        let eval = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 12, 0, 0));
        assert!(eval.can_start);
        assert!(eval.is_active_window);
        assert_eq!(eval.ends_in_seconds, Some(5 * 3_600));
        assert!(eval.reason.is_none());
    }

    #[test]
    fn window_boundaries_are_inclusive() {
        let schedule = nine_to_five(vec![]);
        let at_start = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 9, 0, 0));
        assert!(at_start.is_active_window);
        let at_end = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 17, 0, 0));
        assert!(at_end.is_active_window);
        assert_eq!(at_end.ends_in_seconds, Some(0));
    }

    #[test]
    fn one_second_past_end_is_locked_until_tomorrow() {
        let schedule = nine_to_five(vec![]);
        let eval = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 17, 0, 1));
        assert!(!eval.can_start);
        assert_eq!(eval.reason, Some(LockReason::AfterEnd { end: hm(17, 0) }));
        // Mon 17:00:01 -> Tue 09:00:00
        assert_eq!(eval.starts_in_seconds, Some(15 * 3_600 + 59 * 60 + 59));
    }

    #[test]
    fn after_end_honors_scheduled_days() {
        // Monday-only schedule, evaluated Monday evening: the next start is
        // next Monday, not tomorrow.
        let schedule = nine_to_five(vec![1]);
        let eval = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 18, 0, 0));
        assert_eq!(eval.reason, Some(LockReason::AfterEnd { end: hm(17, 0) }));
        // Mon 18:00 -> next Mon 09:00 = 6 days + 15 hours
        assert_eq!(eval.starts_in_seconds, Some(6 * 86_400 + 15 * 3_600));
    }

    #[test]
    fn missing_end_time_defaults_to_end_of_day() {
        let schedule = Schedule {
            start_time: Some(hm(9, 0)),
            end_time: None,
            days: vec![],
        };
        let eval = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 23, 59, 30));
        assert_eq!(eval.reason, Some(LockReason::AfterEnd { end: hm(23, 59) }));
        // 23:59:30 -> tomorrow 09:00 = 30s + 9h
        assert_eq!(eval.starts_in_seconds, Some(30 + 9 * 3_600));
    }

    #[test]
    fn display_status_mapping() {
        let schedule = nine_to_five(vec![]);

        let active = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 12, 0, 0));
        assert_eq!(
            ScheduleDisplay::from_eval(&active).status,
            DisplayStatus::Active
        );

        let soon = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 8, 45, 0));
        assert_eq!(
            ScheduleDisplay::from_eval(&soon).status,
            DisplayStatus::StartingSoon
        );

        let locked = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 6, 0, 0));
        assert_eq!(
            ScheduleDisplay::from_eval(&locked).status,
            DisplayStatus::Locked
        );

        let ended = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 18, 0, 0));
        assert_eq!(
            ScheduleDisplay::from_eval(&ended).status,
            DisplayStatus::Ended
        );

        let none = evaluate(BillingMode::Hourly, &schedule, at(2026, 8, 3, 18, 0, 0));
        let display = ScheduleDisplay::from_eval(&none);
        assert_eq!(display.status, DisplayStatus::NoSchedule);
        assert!(display.countdown.is_none());
    }

    #[test]
    fn starting_soon_boundary_is_thirty_minutes() {
        let schedule = nine_to_five(vec![]);
        let exactly = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 8, 30, 0));
        assert_eq!(
            ScheduleDisplay::from_eval(&exactly).status,
            DisplayStatus::StartingSoon
        );
        let just_over = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 8, 29, 59));
        assert_eq!(
            ScheduleDisplay::from_eval(&just_over).status,
            DisplayStatus::Locked
        );
    }

    #[test]
    fn countdown_formatting() {
        assert_eq!(format_countdown(0), "00:00:00");
        assert_eq!(format_countdown(30), "00:00:30");
        assert_eq!(format_countdown(3_661), "01:01:01");
        // Multi-day countdowns keep accumulating hours.
        assert_eq!(format_countdown(200_000), "55:33:20");
        assert_eq!(format_countdown(-5), "00:00:00");
    }

    #[test]
    fn lock_reason_display_names_the_boundary() {
        let after = LockReason::AfterEnd { end: hm(17, 0) };
        assert_eq!(after.to_string(), "window ended at 17:00");
        let before = LockReason::BeforeStart { start: hm(9, 0) };
        assert_eq!(before.to_string(), "window opens at 09:00");
        let day = LockReason::NotScheduledToday { next_day: 1 };
        assert_eq!(
            day.to_string(),
            "not scheduled today; next window opens on Monday"
        );
    }

    #[test]
    fn eval_serializes_without_null_noise() {
        let schedule = nine_to_five(vec![]);
        let eval = evaluate(BillingMode::Scheduled, &schedule, at(2026, 8, 3, 12, 0, 0));
        let json = serde_json::to_value(&eval).unwrap();
        assert!(json.get("starts_in_seconds").is_none());
        assert_eq!(json["ends_in_seconds"], 18_000);
        assert_eq!(json["can_start"], true);
    }
}
