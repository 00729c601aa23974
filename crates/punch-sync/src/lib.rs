//! Domain event publisher for the punch time tracker.
//!
//! The real-time fan-out transport is an external collaborator; this crate
//! only delivers event batches to its ingest endpoint. Session and payroll
//! operations return the events they imply, and the caller hands them to a
//! [`Publisher`]. Delivery is best-effort from the caller's perspective —
//! the ledger transaction has already committed by the time events are
//! published.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use punch_core::DomainEvent;

/// Default request timeout for event delivery.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Event publisher errors.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The configured endpoint was unusable.
    #[error("invalid endpoint: {reason}")]
    InvalidEndpoint { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// The endpoint answered with a non-success status.
    #[error("endpoint rejected events: status {status}: {message}")]
    Rejected { status: u16, message: String },
}

/// HTTP publisher for domain events.
///
/// # Thread Safety
///
/// The publisher is safe to clone and share across threads. Each clone
/// shares the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Publisher {
    http: reqwest::Client,
    endpoint: String,
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl Publisher {
    /// Creates a publisher for the given ingest endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is empty or not an http(s) URL, or
    /// if the HTTP client fails to build.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SyncError> {
        let endpoint = endpoint.into();

        if endpoint.trim().is_empty() {
            return Err(SyncError::InvalidEndpoint {
                reason: "endpoint cannot be empty",
            });
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(SyncError::InvalidEndpoint {
                reason: "endpoint must be an http(s) URL",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(SyncError::ClientBuild)?;

        Ok(Self { http, endpoint })
    }

    /// Delivers a batch of events as a JSON array.
    ///
    /// An empty batch is a no-op.
    pub async fn publish(&self, events: &[DomainEvent]) -> Result<(), SyncError> {
        if events.is_empty() {
            return Ok(());
        }

        let response = self.http.post(&self.endpoint).json(events).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SyncError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}
