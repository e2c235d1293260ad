//! Bounded retry with linear backoff and rate-limit compliance.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::transport::{ClientErrorKind, Outcome, Transport, TransportRequest};
use crate::{Error, Operation, Result, TRACING_TARGET_RETRY, TransientCause};

/// Default number of tries per logical request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default base backoff.
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Retry policy for one logical request.
///
/// The attempt counter is local to a single call of [`RetryPolicy::execute`]:
/// every page of a listing and every chunk of a batch gets a fresh budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on total tries, first try included.
    pub max_attempts: u32,
    /// Sleep after the n-th failed try is `base_backoff * n`.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_backoff: DEFAULT_BASE_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff,
        }
    }

    /// Sleep before the next try after `failed_attempts` transient failures.
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        self.base_backoff.saturating_mul(failed_attempts)
    }

    /// Sleep after a 429: the server's hint when present, else the base backoff.
    pub fn rate_limit_delay(&self, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or(self.base_backoff)
    }

    /// Drives one logical request through the transport until it succeeds,
    /// fails terminally, exhausts the budget, or is cancelled.
    pub async fn execute(
        &self,
        transport: &dyn Transport,
        operation: Operation,
        request: &TransportRequest,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        self.execute_as(transport, operation, request, cancel).await
    }

    /// Like [`RetryPolicy::execute`], decoding the success body into `T`.
    ///
    /// A body that does not match `T` is a terminal [`Error::InvalidResponse`].
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        transport: &dyn Transport,
        operation: Operation,
        request: &TransportRequest,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let resource = request.resource();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled {
                    operation,
                    resource,
                    attempts: attempt,
                });
            }

            tracing::debug!(
                target: TRACING_TARGET_RETRY,
                operation = %operation,
                resource = %resource,
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                "Issuing request"
            );

            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    return Err(Error::Cancelled {
                        operation,
                        resource,
                        attempts: attempt + 1,
                    });
                }
                outcome = transport.send(request) => outcome,
            };

            let delay = match outcome {
                Outcome::Success(value) => {
                    let decoded = serde_json::from_value::<T>(value).map_err(|err| {
                        Error::InvalidResponse {
                            operation,
                            resource: resource.clone(),
                            attempts: attempt + 1,
                            message: format!("unexpected response shape: {err}"),
                        }
                    })?;
                    if attempt > 0 {
                        tracing::info!(
                            target: TRACING_TARGET_RETRY,
                            operation = %operation,
                            resource = %resource,
                            attempt = attempt + 1,
                            "Request succeeded after retry"
                        );
                    }
                    return Ok(decoded);
                }
                Outcome::ClientError {
                    status,
                    message,
                    kind,
                } => {
                    let attempts = attempt + 1;
                    tracing::error!(
                        target: TRACING_TARGET_RETRY,
                        operation = %operation,
                        resource = %resource,
                        status,
                        message = %message,
                        "Request rejected"
                    );
                    return Err(match kind {
                        ClientErrorKind::Authentication => Error::Authentication {
                            operation,
                            resource,
                            attempts,
                            status,
                            message,
                        },
                        ClientErrorKind::Request => Error::ClientRequest {
                            operation,
                            resource,
                            attempts,
                            status,
                            message,
                        },
                    });
                }
                Outcome::Malformed { message } => {
                    tracing::error!(
                        target: TRACING_TARGET_RETRY,
                        operation = %operation,
                        resource = %resource,
                        message = %message,
                        "Response body could not be decoded"
                    );
                    return Err(Error::InvalidResponse {
                        operation,
                        resource,
                        attempts: attempt + 1,
                        message,
                    });
                }
                Outcome::RateLimited { retry_after } => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            target: TRACING_TARGET_RETRY,
                            operation = %operation,
                            resource = %resource,
                            attempts = attempt,
                            "Rate limit not lifted, giving up"
                        );
                        return Err(Error::RateLimitExceeded {
                            operation,
                            resource,
                            attempts: attempt,
                            retry_after,
                        });
                    }

                    let delay = self.rate_limit_delay(retry_after);
                    tracing::warn!(
                        target: TRACING_TARGET_RETRY,
                        operation = %operation,
                        resource = %resource,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, retrying"
                    );
                    delay
                }
                Outcome::ServerError { status, message } => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            target: TRACING_TARGET_RETRY,
                            operation = %operation,
                            resource = %resource,
                            attempts = attempt,
                            status,
                            message = %message,
                            "Request failed permanently"
                        );
                        return Err(Error::TransientFailureExhausted {
                            operation,
                            resource,
                            attempts: attempt,
                            last_cause: TransientCause::Status(status),
                        });
                    }

                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        target: TRACING_TARGET_RETRY,
                        operation = %operation,
                        resource = %resource,
                        attempt,
                        max_attempts = self.max_attempts,
                        status,
                        delay_ms = delay.as_millis() as u64,
                        "Server error, retrying"
                    );
                    delay
                }
                Outcome::NetworkFailure { cause } => {
                    attempt += 1;
                    if attempt >= self.max_attempts {
                        tracing::error!(
                            target: TRACING_TARGET_RETRY,
                            operation = %operation,
                            resource = %resource,
                            attempts = attempt,
                            cause = %cause,
                            "Request failed permanently"
                        );
                        return Err(Error::TransientFailureExhausted {
                            operation,
                            resource,
                            attempts: attempt,
                            last_cause: TransientCause::Network(cause),
                        });
                    }

                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        target: TRACING_TARGET_RETRY,
                        operation = %operation,
                        resource = %resource,
                        attempt,
                        max_attempts = self.max_attempts,
                        cause = %cause,
                        delay_ms = delay.as_millis() as u64,
                        "Network failure, retrying"
                    );
                    delay
                }
            };

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(
                        target: TRACING_TARGET_RETRY,
                        operation = %operation,
                        resource = %resource,
                        attempts = attempt,
                        "Cancelled during backoff"
                    );
                    return Err(Error::Cancelled {
                        operation,
                        resource,
                        attempts: attempt,
                    });
                }
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::time::Instant;

    use super::*;
    use crate::mock::MockTransport;

    fn server_error(status: u16) -> Outcome {
        Outcome::ServerError {
            status,
            message: "unavailable".into(),
        }
    }

    fn request() -> TransportRequest {
        TransportRequest::get("Properties")
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_server_errors_exhaust_budget() {
        let transport = MockTransport::new(std::iter::repeat_n(server_error(502), 10));
        let policy = RetryPolicy::default();

        let error = policy
            .execute(&transport, Operation::List, &request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 5);
        assert!(matches!(
            error,
            Error::TransientFailureExhausted {
                attempts: 5,
                last_cause: TransientCause::Status(502),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failures_exhaust_budget() {
        let transport = MockTransport::new(std::iter::repeat_n(
            Outcome::NetworkFailure {
                cause: "connection reset".into(),
            },
            3,
        ));
        let policy = RetryPolicy::new(3, Duration::from_millis(10));

        let error = policy
            .execute(&transport, Operation::Get, &request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 3);
        assert_eq!(error.attempts(), Some(3));
        assert_eq!(error.category(), "transient_failure_exhausted");
    }

    #[tokio::test(start_paused = true)]
    async fn test_linear_backoff_then_success() {
        let transport = MockTransport::new([
            server_error(503),
            server_error(503),
            Outcome::Success(json!({"id": "rec1"})),
        ]);
        let policy = RetryPolicy::default();
        let started = Instant::now();

        let value = policy
            .execute(&transport, Operation::Get, &request(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(value, json!({"id": "rec1"}));
        assert_eq!(transport.calls(), 3);
        // 1s after the first failure, 2s after the second.
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_is_honored() {
        let transport = MockTransport::new([
            Outcome::RateLimited {
                retry_after: Some(Duration::from_secs(3)),
            },
            Outcome::Success(json!({})),
        ]);
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        let started = Instant::now();

        policy
            .execute(&transport, Operation::List, &request(), &CancellationToken::new())
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(3));
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_without_hint_uses_base_backoff() {
        let transport = MockTransport::new([
            Outcome::RateLimited { retry_after: None },
            Outcome::Success(json!({})),
        ]);
        let policy = RetryPolicy::new(5, Duration::from_millis(250));
        let started = Instant::now();

        policy
            .execute(&transport, Operation::List, &request(), &CancellationToken::new())
            .await
            .unwrap();

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(250));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_shares_budget() {
        let transport = MockTransport::new([
            server_error(500),
            Outcome::RateLimited {
                retry_after: Some(Duration::from_secs(1)),
            },
            Outcome::RateLimited {
                retry_after: Some(Duration::from_secs(2)),
            },
        ]);
        let policy = RetryPolicy::new(3, Duration::from_millis(10));

        let error = policy
            .execute(&transport, Operation::Update, &request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 3);
        assert!(matches!(
            error,
            Error::RateLimitExceeded {
                attempts: 3,
                retry_after: Some(d),
                ..
            } if d == Duration::from_secs(2)
        ));
        assert_eq!(error.status_code(), Some(429));
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried() {
        let transport = MockTransport::new([
            Outcome::ClientError {
                status: 404,
                message: "NOT_FOUND".into(),
                kind: ClientErrorKind::Request,
            },
            Outcome::Success(json!({})),
        ]);
        let policy = RetryPolicy::default();

        let error = policy
            .execute(&transport, Operation::Get, &request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 1);
        assert!(matches!(
            error,
            Error::ClientRequest {
                status: 404,
                attempts: 1,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_authentication_failure_is_not_retried() {
        let transport = MockTransport::new([Outcome::ClientError {
            status: 401,
            message: "AUTHENTICATION_REQUIRED".into(),
            kind: ClientErrorKind::Authentication,
        }]);
        let policy = RetryPolicy::default();

        let error = policy
            .execute(&transport, Operation::List, &request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 1);
        assert!(error.is_authentication());
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_body_is_terminal() {
        let transport = MockTransport::new([Outcome::Malformed {
            message: "not json".into(),
        }]);
        let policy = RetryPolicy::default();

        let error = policy
            .execute(&transport, Operation::Get, &request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 1);
        assert_eq!(error.category(), "invalid_response");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff() {
        let transport = MockTransport::new([server_error(503), Outcome::Success(json!({}))]);
        let policy = RetryPolicy::new(5, Duration::from_secs(60));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let error = policy
            .execute(&transport, Operation::List, &request(), &cancel)
            .await
            .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(60));
        assert_eq!(transport.calls(), 1);
        assert!(matches!(error, Error::Cancelled { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_attempt() {
        let transport = MockTransport::new([Outcome::Success(json!({}))]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let error = RetryPolicy::default()
            .execute(&transport, Operation::List, &request(), &cancel)
            .await
            .unwrap_err();

        assert_eq!(transport.calls(), 0);
        assert!(matches!(error, Error::Cancelled { attempts: 0, .. }));
    }

    #[tokio::test]
    async fn test_unexpected_shape_is_invalid_response() {
        #[derive(Debug, serde::Deserialize)]
        struct Page {
            #[allow(dead_code)]
            records: Vec<Value>,
        }

        let transport = MockTransport::new([Outcome::Success(json!({"records": "nope"}))]);
        let error = RetryPolicy::default()
            .execute_as::<Page>(&transport, Operation::List, &request(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(error, Error::InvalidResponse { attempts: 1, .. }));
    }

    #[test]
    fn test_backoff_is_linear() {
        let policy = RetryPolicy::new(5, Duration::from_millis(200));
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(600));
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
