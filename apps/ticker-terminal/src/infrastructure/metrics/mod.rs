//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Samples**: prices delivered to sessions, dropped on full queues, unparsable frames
//! - **Feeds**: live exchange connections, reconnect attempts, connection errors
//! - **Sessions**: active and total terminal sessions
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port. Recording
//! before [`init_metrics`] is a no-op.

use std::sync::OnceLock;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if the recorder cannot be installed.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let builder = PrometheusBuilder::new();
            let handle = builder
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Names
// =============================================================================

const SAMPLES_RECEIVED: &str = "ticker_terminal_samples_received_total";
const SAMPLES_DROPPED: &str = "ticker_terminal_samples_dropped_total";
const PARSE_FAILURES: &str = "ticker_terminal_parse_failures_total";
const FEED_CONNECTIONS: &str = "ticker_terminal_feed_connections";
const FEED_ERRORS: &str = "ticker_terminal_feed_errors_total";
const RECONNECTS: &str = "ticker_terminal_reconnects_total";
const SESSIONS_ACTIVE: &str = "ticker_terminal_sessions_active";
const SESSIONS_TOTAL: &str = "ticker_terminal_sessions_total";

fn register_metrics() {
    describe_counter!(SAMPLES_RECEIVED, "Prices queued for sessions");
    describe_counter!(
        SAMPLES_DROPPED,
        "Prices discarded because a session queue was full"
    );
    describe_counter!(PARSE_FAILURES, "Feed frames that did not carry a price");

    describe_gauge!(FEED_CONNECTIONS, "Open exchange WebSocket connections");
    describe_counter!(FEED_ERRORS, "Feed connection errors by type");
    describe_counter!(RECONNECTS, "Feed reconnection attempts after a failed dial");

    describe_gauge!(SESSIONS_ACTIVE, "Terminal sessions currently open");
    describe_counter!(SESSIONS_TOTAL, "Terminal sessions opened since start");
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record a price queued for a session.
pub fn record_sample_received() {
    counter!(SAMPLES_RECEIVED).increment(1);
}

/// Record a price dropped on a full session queue.
pub fn record_sample_dropped() {
    counter!(SAMPLES_DROPPED).increment(1);
}

/// Record a feed frame that failed to decode.
pub fn record_parse_failure() {
    counter!(PARSE_FAILURES).increment(1);
}

/// Track a feed connection opening or closing.
pub fn set_feed_connected(connected: bool) {
    let connections = gauge!(FEED_CONNECTIONS);
    if connected {
        connections.increment(1.0);
    } else {
        connections.decrement(1.0);
    }
}

/// Record a feed error.
pub fn record_feed_error(error_type: &'static str) {
    counter!(FEED_ERRORS, "error_type" => error_type).increment(1);
}

/// Record a feed reconnection attempt.
pub fn record_reconnect() {
    counter!(RECONNECTS).increment(1);
}

/// Track a session opening.
pub fn record_session_opened() {
    counter!(SESSIONS_TOTAL).increment(1);
    gauge!(SESSIONS_ACTIVE).increment(1.0);
}

/// Track a session closing.
pub fn record_session_closed() {
    gauge!(SESSIONS_ACTIVE).decrement(1.0);
}

// =============================================================================
// Tests
// =============================================================================
