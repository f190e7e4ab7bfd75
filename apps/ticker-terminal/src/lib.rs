#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::cast_possible_truncation,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Ticker Terminal - Live Price Charts over Terminal Sessions
//!
//! Streams the exchange's BTC/USDT mini-ticker into any number of
//! concurrent terminal sessions. Every session owns its own feed
//! connection, bounded price history and chart; nothing is shared between
//! sessions.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure state and data
//!   - `history`: Bounded price history and statistics
//!   - `session`: Session state machine
//!
//! - **Application**: Orchestration
//!   - `render`: Frame rendering and the ASCII chart
//!   - `session`: Per-session controller and live-session registry
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `feed`: Resilient WebSocket client for the mini-ticker stream
//!   - `host`: Plain-TCP terminal host
//!   - `config`: Environment configuration
//!   - `health`: Health check and metrics HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//!                   ┌─────────────┐   ┌──────────┐   ┌────────────┐
//! Exchange WS ────► │ StreamClient│──►│  Sample  │──►│  Session   │──► frames ──► terminal
//!  (per session)    └─────────────┘   │  Channel │   │ Controller │◄── keys ◄───
//!                                     └──────────┘   └─────┬──────┘
//!                                                          ▼
//!                                                   PriceHistory ─► Renderer
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Price history and session state with no I/O.
pub mod domain;

/// Application layer - Session orchestration and rendering.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::history::{HistorySnapshot, PriceHistory, PriceSample, PriceStats, Trend};
pub use domain::session::{
    Key, SessionCommand, SessionEvent, SessionPhase, SessionState, Viewport, transition,
};

// Application
pub use application::render::{ChartGeometry, DisplayConfig, Renderer};
pub use application::session::{
    Frame, HostInput, SessionConfig, SessionController, SessionExit, SessionHandle, SessionId,
    SessionRegistry,
};

// Infrastructure config
pub use infrastructure::config::{
    ConfigError, DisplaySettings, FeedSettings, ServerSettings, SessionSettings, TerminalConfig,
};

// Feed client (for integration tests)
pub use infrastructure::feed::{
    ConnectionState, FeedState, OfferOutcome, SampleReceiver, SampleSender, StreamClient,
    StreamClientConfig, StreamClientError, sample_channel,
};

// Terminal host
pub use infrastructure::host::{HostError, TcpTerminalHost};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
