//! Configuration Module
//!
//! Environment-driven configuration for the terminal host, feed clients and
//! sessions.

mod settings;

pub use settings::{
    ConfigError, DisplaySettings, FeedSettings, ServerSettings, SessionSettings, TerminalConfig,
};
