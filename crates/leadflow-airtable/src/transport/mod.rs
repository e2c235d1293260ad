//! Single HTTP round trips against the record store.
//!
//! A [`Transport`] performs exactly one request per call and classifies the
//! response into an [`Outcome`]. It never retries and never fails with an
//! error for ordinary HTTP statuses; the retry loop decides what each outcome
//! means.

mod http;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

pub use self::http::HttpTransport;

/// One request to issue against `{api_url}/{base_id}/{table}[/{record_id}]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub table: String,
    pub record_id: Option<String>,
    /// Query parameters, in order. Keys may repeat (`fields[]`).
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl TransportRequest {
    /// Creates a GET request against a table.
    pub fn get(table: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            table: table.into(),
            record_id: None,
            params: Vec::new(),
            body: None,
        }
    }

    /// Creates a POST request against a table.
    pub fn post(table: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::get(table)
        }
    }

    /// Creates a PATCH request against a table.
    pub fn patch(table: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::PATCH,
            body: Some(body),
            ..Self::get(table)
        }
    }

    /// Targets a single record.
    #[must_use]
    pub fn with_record_id(mut self, record_id: impl Into<String>) -> Self {
        self.record_id = Some(record_id.into());
        self
    }

    /// Sets the query parameters.
    #[must_use]
    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    /// Returns `table` or `table/record_id` for error reporting.
    pub fn resource(&self) -> String {
        match &self.record_id {
            Some(id) => format!("{}/{}", self.table, id),
            None => self.table.clone(),
        }
    }
}

/// Kind of a terminal 4xx response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// 401, 403, or no credentials configured.
    Authentication,
    /// Any other 4xx except 429.
    Request,
}

/// Classified result of one round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 2xx with a JSON body.
    Success(Value),
    /// 429, with the `Retry-After` hint when the server sent a usable one.
    RateLimited { retry_after: Option<Duration> },
    /// 500..=599.
    ServerError { status: u16, message: String },
    /// Any other non-success status. Never retried.
    ClientError {
        status: u16,
        message: String,
        kind: ClientErrorKind,
    },
    /// The request timed out, could not connect, or the body could not be read.
    NetworkFailure { cause: String },
    /// 2xx whose body is not valid JSON. Never retried.
    Malformed { message: String },
}

impl Outcome {
    /// Returns `true` for outcomes the retry loop may try again.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::NetworkFailure { .. }
        )
    }
}

/// Issues exactly one HTTP request and classifies the response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &TransportRequest) -> Outcome;
}
