//! Ticker Terminal Binary
//!
//! Starts the terminal host and health server.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin ticker-terminal
//! # then, from any ANSI terminal:
//! stty raw -echo; nc localhost 23234; stty sane
//! ```
//!
//! # Environment Variables
//!
//! - `TICKER_LISTEN_ADDR`: Terminal host interface (default: 0.0.0.0)
//! - `TICKER_PORT`: Terminal host port (default: 23234)
//! - `TICKER_HEALTH_PORT`: Health check HTTP port, 0 disables (default: 8083)
//! - `TICKER_FEED_URL`: Mini-ticker WebSocket URL (default: Binance BTC/USDT)
//! - `TICKER_QUEUE_CAPACITY`: Per-session sample queue (default: 256)
//! - `TICKER_HISTORY_CAPACITY`: Per-session chart history (default: 1800)
//! - `TICKER_KEEPALIVE_SECS`: Feed ping interval (default: 45)
//! - `TICKER_READ_DEADLINE_SECS`: Feed read deadline (default: 90)
//! - `TICKER_PING_WRITE_DEADLINE_SECS`: Ping write deadline (default: 5)
//! - `TICKER_BACKOFF_CAP_SECS`: Maximum reconnect delay (default: 30)
//! - `TICKER_BACKOFF_BASE`: Reconnect delay base (default: 2)
//! - `TICKER_BACKOFF_EXPONENT_CAP`: Reconnect exponent cap (default: 6)
//! - `TICKER_MAX_RECONNECT_ATTEMPTS`: Give up after N failed dials, 0 = never (default: 0)
//! - `TICKER_DEFAULT_WIDTH` / `TICKER_DEFAULT_HEIGHT`: Session size (default: 80x24)
//! - `TICKER_CZK_RATE`: USDT to CZK rate for the second value line (default: 21)
//! - `OTEL_ENABLED`: Export traces over OTLP (default: false)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use ticker_terminal::infrastructure::health::{HealthServer, HealthServerState};
use ticker_terminal::infrastructure::telemetry;
use ticker_terminal::{
    SessionConfig, SessionRegistry, TcpTerminalHost, TerminalConfig, Viewport, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting ticker terminal");

    let _metrics_handle = init_metrics();

    let config = TerminalConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();
    let registry = Arc::new(SessionRegistry::new());

    if config.server.health_port != 0 {
        let health_state = Arc::new(HealthServerState::new(
            env!("CARGO_PKG_VERSION").to_string(),
            Arc::clone(&registry),
        ));
        let health_server = HealthServer::new(
            config.server.health_port,
            health_state,
            shutdown_token.clone(),
        );
        tokio::spawn(async move {
            if let Err(e) = health_server.run().await {
                tracing::error!(error = %e, "Health server error");
            }
        });
    }

    let host = TcpTerminalHost::new(
        config.listen_address(),
        SessionConfig::from_terminal_config(&config),
        Viewport::new(config.session.default_width, config.session.default_height),
        Arc::clone(&registry),
        shutdown_token.clone(),
    );
    let host_task = tokio::spawn(host.run());

    tracing::info!("Ticker terminal ready");

    tokio::select! {
        () = await_shutdown(shutdown_token.clone()) => {}
        result = host_task => {
            shutdown_token.cancel();
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(error = %e, "Terminal host failed");
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    drain_sessions(&registry).await;

    tracing::info!("Ticker terminal stopped");
    Ok(())
}

/// Wait for open sessions to deregister after cancellation.
async fn drain_sessions(registry: &SessionRegistry) {
    let drained = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        while registry.active() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;

    if drained.is_err() {
        tracing::warn!(
            remaining = registry.active(),
            "Sessions still open at shutdown timeout"
        );
    }
}

/// Log the parsed configuration.
fn log_config(config: &TerminalConfig) {
    tracing::info!(
        listen = %config.listen_address(),
        health_port = config.server.health_port,
        queue_capacity = config.session.queue_capacity,
        history_capacity = config.session.history_capacity,
        "Configuration loaded"
    );
    tracing::debug!(
        feed_url = %config.feed.url,
        keepalive_secs = config.feed.keepalive_interval.as_secs(),
        read_deadline_secs = config.feed.read_deadline.as_secs(),
        backoff_cap_secs = config.feed.backoff_cap.as_secs(),
        "Feed settings"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
