//! Health Check and Metrics Endpoint
//!
//! Small axum server next to the terminal host. It reports session and feed
//! counts from the [`SessionRegistry`], one entry per open session, and
//! exposes the Prometheus recorder.
//!
//! # Endpoints
//!
//! - `GET /health` - JSON report; 503 when unhealthy
//! - `GET /healthz` - liveness, always `OK`
//! - `GET /readyz` - readiness, `READY` while the terminal host accepts
//! - `GET /metrics` - Prometheus text format

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::session::{RegistryStats, SessionId, SessionInfo, SessionRegistry};
use crate::infrastructure::metrics::get_metrics_handle;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status: "healthy", "degraded", or "unhealthy".
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Whether the terminal host is accepting connections.
    pub accepting: bool,
    /// Session counts.
    pub sessions: SessionStatus,
    /// Open sessions, oldest first.
    pub session_details: Vec<SessionDetail>,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every open session has a live feed.
    Healthy,
    /// Some sessions are waiting on their feed.
    Degraded,
    /// No session has a live feed, or the host is not accepting.
    Unhealthy,
}

/// Session counts.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SessionStatus {
    /// Sessions currently open.
    pub active: usize,
    /// Open sessions whose feed is connected.
    pub feeds_connected: usize,
    /// Sessions opened since start.
    pub total: u64,
}

impl From<RegistryStats> for SessionStatus {
    fn from(stats: RegistryStats) -> Self {
        Self {
            active: stats.active,
            feeds_connected: stats.feeds_connected,
            total: stats.total,
        }
    }
}

/// One open session and its feed.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    /// Session identifier.
    pub id: String,
    /// Remote peer, when known.
    pub peer: Option<String>,
    /// When the session was opened.
    pub opened_at: DateTime<Utc>,
    /// Feed connection state label.
    pub feed_state: &'static str,
    /// Most recent successful feed connect.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Successful feed connects.
    pub connects: u32,
    /// Frames received from the feed.
    pub frames_received: u64,
    /// Samples discarded on a full queue.
    pub samples_dropped: u64,
}

impl SessionDetail {
    fn new(id: SessionId, info: &SessionInfo) -> Self {
        Self {
            id: id.to_string(),
            peer: info.peer.clone(),
            opened_at: info.opened_at,
            feed_state: info.feed.get_state().as_str(),
            last_connected_at: info.feed.last_connected_at(),
            connects: info.feed.connects(),
            frames_received: info.feed.frames_received(),
            samples_dropped: info.feed.samples_dropped(),
        }
    }
}

// =============================================================================
// Server
// =============================================================================

/// State shared by the HTTP handlers.
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    registry: Arc<SessionRegistry>,
}

impl HealthServerState {
    /// Report `version` and the sessions tracked by `registry`.
    #[must_use]
    pub fn new(version: String, registry: Arc<SessionRegistry>) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            registry,
        }
    }
}

/// HTTP server for liveness, readiness and metrics scraping.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Serve on `0.0.0.0:port` until `cancel` fires.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Bind the port and serve.
    ///
    /// # Errors
    ///
    /// Returns `BindFailed` when the port is unavailable and `ServerFailed`
    /// if axum stops with an error.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| HealthServerError::BindFailed { addr, source })?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    ///
    /// # Errors
    ///
    /// Returns `ServerFailed` if axum stops with an error.
    pub async fn serve(self, listener: TcpListener) -> Result<(), HealthServerError> {
        let local_addr = listener.local_addr().ok();
        tracing::info!(addr = ?local_addr, "Health server listening");

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(HealthServerError::ServerFailed)?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(|| async { (StatusCode::OK, "OK") }))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let report = build_health_response(&state);
    let code = if report.status == HealthStatus::Unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(report))
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.registry.is_accepting() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    let Some(handle) = get_metrics_handle() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        );
    };
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        handle.render(),
    )
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let accepting = state.registry.is_accepting();
    let sessions = SessionStatus::from(state.registry.stats());
    let session_details = state
        .registry
        .sessions()
        .iter()
        .map(|(id, info)| SessionDetail::new(*id, info))
        .collect();

    HealthResponse {
        status: determine_health_status(accepting, &sessions),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        accepting,
        sessions,
        session_details,
    }
}

/// A host that is not accepting is unhealthy. Otherwise health follows the
/// share of open sessions whose feed is connected; an idle host is healthy.
const fn determine_health_status(accepting: bool, sessions: &SessionStatus) -> HealthStatus {
    if !accepting {
        return HealthStatus::Unhealthy;
    }

    match (sessions.active, sessions.feeds_connected) {
        (0, _) => HealthStatus::Healthy,
        (active, connected) if connected == active => HealthStatus::Healthy,
        (_, 0) => HealthStatus::Unhealthy,
        _ => HealthStatus::Degraded,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// The listen address could not be bound.
    #[error("failed to bind health server to {addr}: {source}")]
    BindFailed {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// axum stopped with an error.
    #[error("health server failed: {0}")]
    ServerFailed(#[source] std::io::Error),
}

// =============================================================================
// Tests
// =============================================================================
