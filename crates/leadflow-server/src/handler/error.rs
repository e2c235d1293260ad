//! HTTP errors and their JSON representation.

use std::borrow::Cow;
use std::fmt;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use leadflow_airtable::Error as StoreError;
use serde::{Deserialize, Serialize};

/// Tracing target for error responses.
const TRACING_TARGET: &str = "leadflow_server::handler::error";

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable identifier of the error kind.
    pub name: Cow<'static, str>,
    /// Message safe for client display.
    pub message: Cow<'static, str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Cow<'static, str>>,
}

/// HTTP error kinds, one per status the API answers with.
#[must_use = "error kinds do nothing unless used to create errors"]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 400 Bad Request - Invalid request data
    BadRequest,
    /// 404 Not Found - Unknown route or agent
    NotFound,
    /// 500 Internal Server Error - Unexpected server error
    #[default]
    InternalServerError,
    /// 502 Bad Gateway - The record store rejected or garbled a request
    BadGateway,
    /// 503 Service Unavailable - The record store stayed throttled or down
    ServiceUnavailable,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::BadRequest => "bad_request",
            Self::NotFound => "not_found",
            Self::InternalServerError => "internal_server_error",
            Self::BadGateway => "bad_gateway",
            Self::ServiceUnavailable => "service_unavailable",
        }
    }

    /// Default message used when the error carries none.
    pub fn default_message(self) -> &'static str {
        match self {
            Self::BadRequest => "The request could not be processed due to invalid data",
            Self::NotFound => "The requested resource was not found",
            Self::InternalServerError => "An internal server error occurred. Please try again later",
            Self::BadGateway => "The record store rejected the request",
            Self::ServiceUnavailable => "The record store is unavailable. Please try again later",
        }
    }

    /// Converts this kind into an [`Error`] with a custom message.
    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'static, str>>) -> Error {
        Error::new(self).with_message(message)
    }
}

impl IntoResponse for ErrorKind {
    fn into_response(self) -> Response {
        Error::new(self).into_response()
    }
}

/// The error type of HTTP handlers.
#[derive(Debug, Clone)]
#[must_use = "errors do nothing unless serialized"]
pub struct Error {
    kind: ErrorKind,
    message: Option<Cow<'static, str>>,
    resource: Option<Cow<'static, str>>,
}

impl Error {
    #[inline]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            resource: None,
        }
    }

    /// Replaces the default message.
    #[inline]
    pub fn with_message(self, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: Some(message.into()),
            ..self
        }
    }

    /// Sets the resource that caused the error.
    #[inline]
    pub fn with_resource(self, resource: impl Into<Cow<'static, str>>) -> Self {
        Self {
            resource: Some(resource.into()),
            ..self
        }
    }

    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        self.message
            .as_deref()
            .unwrap_or_else(|| self.kind.default_message())
    }

    /// Returns the response body of this error.
    pub fn response(&self) -> ErrorResponse {
        ErrorResponse {
            name: Cow::Borrowed(self.kind.name()),
            message: Cow::Owned(self.message().to_owned()),
            resource: self.resource.clone(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}): {}",
            self.kind.name(),
            self.kind.status().as_u16(),
            self.message()
        )?;
        if let Some(resource) = &self.resource {
            write!(f, " [resource: {resource}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.kind.status();
        if status.is_server_error() {
            tracing::error!(target: TRACING_TARGET, error = %self, "Request failed");
        } else {
            tracing::debug!(target: TRACING_TARGET, error = %self, "Request rejected");
        }
        (status, Json(self.response())).into_response()
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<leadflow_agents::Error> for Error {
    fn from(error: leadflow_agents::Error) -> Self {
        use leadflow_agents::Error as AgentError;

        match error {
            AgentError::UnknownAgent(_) => ErrorKind::NotFound
                .with_message(error.to_string())
                .with_resource("agent"),
            AgentError::InvalidInput(message) => ErrorKind::BadRequest.with_message(message),
            AgentError::Store(store) => store.into(),
            AgentError::Config(_) => ErrorKind::InternalServerError.with_message(error.to_string()),
        }
    }
}

impl From<StoreError> for Error {
    fn from(error: StoreError) -> Self {
        let kind = match error.root_cause() {
            StoreError::RateLimitExceeded { .. }
            | StoreError::TransientFailureExhausted { .. }
            | StoreError::Cancelled { .. } => ErrorKind::ServiceUnavailable,
            StoreError::Authentication { .. }
            | StoreError::ClientRequest { .. }
            | StoreError::InvalidResponse { .. }
            | StoreError::Http(_) => ErrorKind::BadGateway,
            _ => ErrorKind::InternalServerError,
        };
        kind.with_message(error.to_string())
            .with_resource("record_store")
    }
}

/// Result type of HTTP handlers.
pub type Result<T, E = Error> = std::result::Result<T, E>;
