//! Error types for leadflow-airtable.
//!
//! Every variant carries the operation and the resource it was issued against,
//! so callers can log the failure and decide on escalation without inspecting
//! the transport. Terminal variants (`Authentication`, `ClientRequest`,
//! `InvalidResponse`) are never retried by the client; the exhausted variants
//! report how many attempts were spent.

use std::fmt;
use std::ops::Range;
use std::time::Duration;

use crate::record::Record;

/// Result type alias for leadflow-airtable operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Record operation that was being performed when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Paginated listing of a table.
    List,
    /// Single record read.
    Get,
    /// Single record create.
    Create,
    /// Single record update.
    Update,
    /// Chunked multi-record create.
    BatchCreate,
    /// Chunked multi-record update.
    BatchUpdate,
}

impl Operation {
    /// Returns the operation as a string for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Get => "get",
            Self::Create => "create",
            Self::Update => "update",
            Self::BatchCreate => "batch_create",
            Self::BatchUpdate => "batch_update",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The last transient condition observed before the attempt budget ran out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransientCause {
    /// The server answered with a 5xx status.
    Status(u16),
    /// The request never produced a response.
    Network(String),
}

impl fmt::Display for TransientCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "server error (status {status})"),
            Self::Network(cause) => write!(f, "network failure: {cause}"),
        }
    }
}

/// Error type for record store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Credentials were missing or rejected. Never retried.
    #[error("{operation} on {resource}: authentication rejected (status {status}): {message}")]
    Authentication {
        operation: Operation,
        resource: String,
        attempts: u32,
        status: u16,
        message: String,
    },

    /// The server rejected the request with a 4xx other than 429. Never retried.
    #[error("{operation} on {resource}: request rejected (status {status}): {message}")]
    ClientRequest {
        operation: Operation,
        resource: String,
        attempts: u32,
        status: u16,
        message: String,
    },

    /// The attempt budget ran out while the server kept answering 429.
    #[error("{operation} on {resource}: still rate limited after {attempts} attempts")]
    RateLimitExceeded {
        operation: Operation,
        resource: String,
        attempts: u32,
        /// Retry-After hint carried by the last 429, if any.
        retry_after: Option<Duration>,
    },

    /// The attempt budget ran out on network failures or 5xx responses.
    #[error("{operation} on {resource}: gave up after {attempts} attempts, last {last_cause}")]
    TransientFailureExhausted {
        operation: Operation,
        resource: String,
        attempts: u32,
        last_cause: TransientCause,
    },

    /// The server answered 2xx with a body the client could not decode.
    #[error("{operation} on {resource}: invalid response: {message}")]
    InvalidResponse {
        operation: Operation,
        resource: String,
        attempts: u32,
        message: String,
    },

    /// The caller cancelled the operation.
    #[error("{operation} on {resource}: cancelled after {attempts} attempts")]
    Cancelled {
        operation: Operation,
        resource: String,
        attempts: u32,
    },

    /// A chunk of a batch write failed after earlier chunks were applied.
    ///
    /// Entries before `attempted.start` are confirmed and returned in
    /// `confirmed`; every entry from `attempted.start` onward was not applied.
    #[error(
        "{operation} on {table}: chunk {chunk_index} failed, {confirmed_count} of {total} records confirmed",
        confirmed_count = .confirmed.len()
    )]
    PartialBatchFailure {
        operation: Operation,
        table: String,
        chunk_index: usize,
        /// Input positions sent in the failed chunk.
        attempted: Range<usize>,
        /// Number of entries in the caller's batch.
        total: usize,
        /// Records returned by every chunk before the failed one.
        confirmed: Vec<Record>,
        /// Record ids of the unapplied entries, empty for creates.
        unapplied_ids: Vec<String>,
        #[source]
        source: Box<Error>,
    },

    /// A page fetch failed after earlier pages succeeded.
    ///
    /// The accumulated records are discarded: callers never receive a
    /// partial listing.
    #[error(
        "list on {table}: aborted after {pages_completed} pages, {records_discarded} records discarded"
    )]
    PaginationAborted {
        table: String,
        pages_completed: usize,
        records_discarded: usize,
        #[source]
        source: Box<Error>,
    },

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The underlying HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns the operation that failed, if the error came from one.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::Authentication { operation, .. }
            | Self::ClientRequest { operation, .. }
            | Self::RateLimitExceeded { operation, .. }
            | Self::TransientFailureExhausted { operation, .. }
            | Self::InvalidResponse { operation, .. }
            | Self::Cancelled { operation, .. }
            | Self::PartialBatchFailure { operation, .. } => Some(*operation),
            Self::PaginationAborted { .. } => Some(Operation::List),
            Self::Config(_) | Self::Http(_) => None,
        }
    }

    /// Returns the attempts spent on the failing logical request.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Authentication { attempts, .. }
            | Self::ClientRequest { attempts, .. }
            | Self::RateLimitExceeded { attempts, .. }
            | Self::TransientFailureExhausted { attempts, .. }
            | Self::InvalidResponse { attempts, .. }
            | Self::Cancelled { attempts, .. } => Some(*attempts),
            Self::PartialBatchFailure { source, .. } | Self::PaginationAborted { source, .. } => {
                source.attempts()
            }
            Self::Config(_) | Self::Http(_) => None,
        }
    }

    /// Returns the last HTTP status the server answered with, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } | Self::ClientRequest { status, .. } => {
                Some(*status)
            }
            Self::RateLimitExceeded { .. } => Some(429),
            Self::TransientFailureExhausted {
                last_cause: TransientCause::Status(status),
                ..
            } => Some(*status),
            Self::PartialBatchFailure { source, .. } | Self::PaginationAborted { source, .. } => {
                source.status_code()
            }
            _ => None,
        }
    }

    /// Returns the innermost error, looking through batch and pagination wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Self::PartialBatchFailure { source, .. } | Self::PaginationAborted { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Returns `true` if the credentials were missing or rejected.
    pub fn is_authentication(&self) -> bool {
        matches!(self.root_cause(), Self::Authentication { .. })
    }

    /// Returns `true` if the caller cancelled the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root_cause(), Self::Cancelled { .. })
    }

    /// Get the error category for metrics/logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Authentication { .. } => "authentication",
            Self::ClientRequest { .. } => "client_request",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::TransientFailureExhausted { .. } => "transient_failure_exhausted",
            Self::InvalidResponse { .. } => "invalid_response",
            Self::Cancelled { .. } => "cancelled",
            Self::PartialBatchFailure { .. } => "partial_batch_failure",
            Self::PaginationAborted { .. } => "pagination_aborted",
            Self::Config(_) => "config",
            Self::Http(_) => "http",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as StdError;

    use super::*;

    fn exhausted() -> Error {
        Error::TransientFailureExhausted {
            operation: Operation::BatchUpdate,
            resource: "Properties".into(),
            attempts: 5,
            last_cause: TransientCause::Status(503),
        }
    }

    #[test]
    fn test_partial_batch_failure_reports_confirmed_prefix() {
        let error = Error::PartialBatchFailure {
            operation: Operation::BatchUpdate,
            table: "Properties".into(),
            chunk_index: 1,
            attempted: 10..20,
            total: 23,
            confirmed: (0..10).map(|i| Record::new(format!("rec{i}"))).collect(),
            unapplied_ids: (10..23).map(|i| format!("rec{i}")).collect(),
            source: Box::new(exhausted()),
        };

        assert_eq!(
            error.to_string(),
            "batch_update on Properties: chunk 1 failed, 10 of 23 records confirmed"
        );
        assert_eq!(error.attempts(), Some(5));
        assert_eq!(error.status_code(), Some(503));
        assert_eq!(error.category(), "partial_batch_failure");
        assert!(StdError::source(&error).is_some());
    }

    #[test]
    fn test_root_cause_looks_through_wrappers() {
        let error = Error::PaginationAborted {
            table: "Properties".into(),
            pages_completed: 2,
            records_discarded: 200,
            source: Box::new(Error::Authentication {
                operation: Operation::List,
                resource: "Properties".into(),
                attempts: 1,
                status: 401,
                message: "AUTHENTICATION_REQUIRED".into(),
            }),
        };

        assert!(error.is_authentication());
        assert_eq!(error.operation(), Some(Operation::List));
        assert_eq!(error.attempts(), Some(1));
    }

    #[test]
    fn test_transient_cause_display() {
        assert_eq!(
            TransientCause::Status(502).to_string(),
            "server error (status 502)"
        );
        assert_eq!(
            TransientCause::Network("connection reset".into()).to_string(),
            "network failure: connection reset"
        );
    }

    #[test]
    fn test_config_error_has_no_operation() {
        let error = Error::config("base id is empty");
        assert_eq!(error.operation(), None);
        assert_eq!(error.attempts(), None);
        assert_eq!(error.to_string(), "Configuration error: base id is empty");
    }
}
