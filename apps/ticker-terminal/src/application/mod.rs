//! Application Layer - Session orchestration and rendering.
//!
//! Composes the domain state machine and history with the feed adapters
//! into running sessions, and turns history snapshots into display text.

/// Frame rendering and chart plotting.
pub mod render;

/// Session controllers and the live-session registry.
pub mod session;
