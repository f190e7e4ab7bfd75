//! Infrastructure Layer - Adapters and external integrations.
//!
//! Exchange feed client, terminal transport, configuration and the
//! operational surfaces (health, metrics, tracing).

/// Exchange WebSocket feed client.
pub mod feed;

/// Plain-TCP terminal host.
pub mod host;

/// Configuration from environment variables.
pub mod config;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Tracing and OpenTelemetry integration.
pub mod telemetry;
