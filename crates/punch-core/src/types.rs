//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid billing mode value.
    #[error("invalid billing mode: {value}")]
    InvalidBillingMode { value: String },

    /// Invalid sub-task status value.
    #[error("invalid sub-task status: {value}")]
    InvalidStatus { value: String },

    /// Invalid pay kind value.
    #[error("invalid pay kind: {value}")]
    InvalidPayKind { value: String },

    /// A weekday index was outside 0..=6.
    #[error("invalid weekday index: {value} (expected 0-6, 0=Sunday)")]
    InvalidWeekday { value: u8 },
}

/// How a sub-task bills time.
///
/// `Scheduled` sub-tasks additionally carry a recurring weekly window that
/// gates when a timer may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingMode {
    /// Billed by tracked hours at the sub-task's hourly rate.
    Hourly,
    /// Billed at a fixed price regardless of tracked time.
    FixedPrice,
    /// Tracked only inside a recurring weekly time window.
    Scheduled,
}

impl BillingMode {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Hourly => "hourly",
            Self::FixedPrice => "fixed_price",
            Self::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for BillingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for BillingMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Self::Hourly),
            "fixed_price" => Ok(Self::FixedPrice),
            "scheduled" => Ok(Self::Scheduled),
            _ => Err(ValidationError::InvalidBillingMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Lifecycle status of a sub-task.
///
/// Transitions: `Pending → InProgress` on start, `InProgress → Pending` on
/// stop or auto-pause, and any state `→ Completed` on completion.
/// `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubTaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl SubTaskStatus {
    /// String representation for database storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    /// Whether no further timer may be started against this status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for SubTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubTaskStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(ValidationError::InvalidStatus {
                value: s.to_string(),
            }),
        }
    }
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated user identifier.
    ///
    /// User IDs are opaque — identity resolution (authentication) happens
    /// upstream and only the resolved internal ID reaches this crate.
    UserId, "user ID"
);

define_string_id!(
    /// A validated sub-task identifier.
    SubTaskId, "sub-task ID"
);

define_string_id!(
    /// A validated task identifier.
    ///
    /// Tasks group sub-tasks and carry the owning company.
    TaskId, "task ID"
);

define_string_id!(
    /// A validated company (tenant) identifier.
    ///
    /// Companies are opaque here; tenant policy lives upstream.
    CompanyId, "company ID"
);

/// Validates a set of weekday indices (0=Sunday … 6=Saturday).
///
/// Returns the indices sorted and deduplicated.
pub fn validate_weekdays(days: &[u8]) -> Result<Vec<u8>, ValidationError> {
    let mut out: Vec<u8> = Vec::with_capacity(days.len());
    for &day in days {
        if day > 6 {
            return Err(ValidationError::InvalidWeekday { value: day });
        }
        if !out.contains(&day) {
            out.push(day);
        }
    }
    out.sort_unstable();
    Ok(out)
}
