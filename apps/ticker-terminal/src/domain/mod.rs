//! Domain Layer - Core session types and business logic.
//!
//! This layer contains the per-session price history and the pure session
//! state machine. Nothing here performs I/O.

/// Bounded price history, statistics and trend.
pub mod history;

/// Session state machine (events, commands, transition).
pub mod session;
