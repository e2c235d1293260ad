//! HTTP server startup with graceful shutdown.

mod shutdown;

use std::future::IntoFuture;
use std::io;
use std::time::{Duration, Instant};

use axum::Router;
use shutdown::shutdown_signal;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Binds the listener and serves `app` until a shutdown signal arrives.
///
/// On Ctrl+C or SIGTERM `shutdown` is cancelled, so agent runs tied to it
/// stop early. In-flight requests then get `shutdown_timeout` to finish.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(
    app: Router,
    config: ServerConfig,
    shutdown: CancellationToken,
) -> io::Result<()> {
    let addr = config.server_addr();
    let listener = TcpListener::bind(addr).await.inspect_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_SERVER_STARTUP,
            addr = %addr,
            error = %err,
            "Failed to bind to address"
        );
    })?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        addr = %addr,
        "Server is ready and listening for connections"
    );
    if config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Server bound to all interfaces (0.0.0.0) - ensure firewall is configured"
        );
    }

    let start_time = Instant::now();
    let signal = {
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    };

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(signal)
        .into_future();
    let result = tokio::select! {
        result = server => result,
        () = drain_deadline(&shutdown, config.shutdown_timeout()) => {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                timeout_secs = config.shutdown_timeout,
                "Shutdown timeout elapsed, dropping in-flight requests"
            );
            Ok(())
        }
    };

    let uptime_secs = start_time.elapsed().as_secs();
    match &result {
        Ok(()) => tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            uptime_secs,
            "Shutdown completed"
        ),
        Err(err) => tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = %err,
            kind = ?err.kind(),
            uptime_secs,
            "Fatal error"
        ),
    }
    result
}

/// Resolves `timeout` after shutdown has started.
async fn drain_deadline(shutdown: &CancellationToken, timeout: Duration) {
    shutdown.cancelled().await;
    tokio::time::sleep(timeout).await;
}
