//! reqwest-backed transport.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use super::{ClientErrorKind, Outcome, Transport, TransportRequest};
use crate::client::AirtableConfig;
use crate::{Error, Result, TRACING_TARGET_TRANSPORT};

/// Longest server message kept in an outcome.
const MAX_MESSAGE_LEN: usize = 512;

/// Production transport: a pooled `reqwest::Client` with the configured
/// timeout and bearer token.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl HttpTransport {
    /// Builds the HTTP client for the given configuration.
    pub fn new(config: &AirtableConfig) -> Result<Self> {
        let mut base_url = config.api_url.clone();
        base_url
            .path_segments_mut()
            .map_err(|()| Error::config(format!("api url cannot be a base: {}", config.api_url)))?
            .pop_if_empty()
            .push(&config.base_id);

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// Returns the URL of the base, e.g. `https://api.airtable.com/v0/appXXX`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves the URL of a request. Table and record id are percent-encoded.
    pub fn url_for(&self, request: &TransportRequest) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(&request.table);
            if let Some(id) = &request.record_id {
                segments.push(id);
            }
        }
        url
    }
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &TransportRequest) -> Outcome {
        if self.api_key.trim().is_empty() {
            return Outcome::ClientError {
                status: StatusCode::UNAUTHORIZED.as_u16(),
                message: "no API key configured".to_owned(),
                kind: ClientErrorKind::Authentication,
            };
        }

        let url = self.url_for(request);
        tracing::debug!(
            target: TRACING_TARGET_TRANSPORT,
            method = %request.method,
            url = %url,
            "Sending request"
        );

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .bearer_auth(&self.api_key);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                return Outcome::NetworkFailure {
                    cause: describe(&err),
                };
            }
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);

        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                return Outcome::NetworkFailure {
                    cause: format!("failed to read response body: {}", describe(&err)),
                };
            }
        };

        tracing::debug!(
            target: TRACING_TARGET_TRANSPORT,
            status = status.as_u16(),
            body_len = body.len(),
            "Received response"
        );

        classify(status, retry_after, &body)
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    }
}

/// Maps a status, `Retry-After` hint and body to an outcome.
pub(crate) fn classify(status: StatusCode, retry_after: Option<Duration>, body: &str) -> Outcome {
    if status.is_success() {
        return match serde_json::from_str::<Value>(body) {
            Ok(value) => Outcome::Success(value),
            Err(err) => Outcome::Malformed {
                message: format!("response body is not valid JSON: {err}"),
            },
        };
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Outcome::RateLimited { retry_after };
    }

    let message = error_message(status, body);
    match status.as_u16() {
        401 | 403 => Outcome::ClientError {
            status: status.as_u16(),
            message,
            kind: ClientErrorKind::Authentication,
        },
        500..=599 => Outcome::ServerError {
            status: status.as_u16(),
            message,
        },
        code => Outcome::ClientError {
            status: code,
            message,
            kind: ClientErrorKind::Request,
        },
    }
}

/// Parses a `Retry-After` value given in seconds.
///
/// HTTP dates and negative or non-numeric values yield `None`, and the retry
/// loop falls back to its base backoff.
pub(crate) fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Extracts the server's message from the Airtable error envelope.
///
/// Handles `{"error": {"type", "message"}}` and `{"error": "TYPE"}`, and
/// falls back to the raw body or the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        match value.get("error") {
            Some(Value::Object(error)) => {
                let kind = error.get("type").and_then(Value::as_str);
                let message = error.get("message").and_then(Value::as_str);
                match (kind, message) {
                    (Some(kind), Some(message)) => return format!("{kind}: {message}"),
                    (None, Some(message)) => return message.to_owned(),
                    (Some(kind), None) => return kind.to_owned(),
                    (None, None) => {}
                }
            }
            Some(Value::String(kind)) => return kind.clone(),
            _ => {}
        }
    }

    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned();
    }

    let mut end = body.len().min(MAX_MESSAGE_LEN);
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    body[..end].to_owned()
}
