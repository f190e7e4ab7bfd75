//! Terminal Configuration Settings
//!
//! Configuration types for the ticker terminal, loaded from environment variables.

use std::time::Duration;

use crate::domain::history::DEFAULT_HISTORY_CAPACITY;
use crate::infrastructure::feed::channel::DEFAULT_QUEUE_CAPACITY;
use crate::infrastructure::feed::messages::DEFAULT_FEED_URL;

/// Exchange feed connection settings.
#[derive(Debug, Clone)]
pub struct FeedSettings {
    /// Mini-ticker WebSocket endpoint.
    pub url: String,
    /// Interval between keepalive pings.
    pub keepalive_interval: Duration,
    /// Silence tolerated before a connection is considered dead.
    pub read_deadline: Duration,
    /// Upper bound on writing one ping frame.
    pub ping_write_deadline: Duration,
    /// Maximum reconnection delay.
    pub backoff_cap: Duration,
    /// Base of the exponential backoff.
    pub backoff_base: u32,
    /// Largest exponent applied to the backoff base.
    pub backoff_exponent_cap: u32,
    /// Consecutive dial failures after which the client gives up (0 = never).
    pub max_reconnect_attempts: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
            keepalive_interval: Duration::from_secs(45),
            read_deadline: Duration::from_secs(90),
            ping_write_deadline: Duration::from_secs(5),
            backoff_cap: Duration::from_secs(30),
            backoff_base: 2,
            backoff_exponent_cap: 6,
            max_reconnect_attempts: 0,
        }
    }
}

/// Per-session resource settings.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Capacity of the feed-to-session sample queue.
    pub queue_capacity: usize,
    /// Number of samples retained for the chart.
    pub history_capacity: usize,
    /// Width used when the host does not report one.
    pub default_width: u16,
    /// Height used when the host does not report one.
    pub default_height: u16,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            default_width: 80,
            default_height: 24,
        }
    }
}

/// Display settings.
#[derive(Debug, Clone)]
pub struct DisplaySettings {
    /// USDT to CZK conversion rate for the secondary value line.
    pub czk_rate: f64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self { czk_rate: 21.0 }
    }
}

/// Listener settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Interface the terminal host binds to.
    pub listen_addr: String,
    /// Terminal host port.
    pub port: u16,
    /// Health check HTTP port (0 = disabled).
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            port: 23234,
            health_port: 8083,
        }
    }
}

/// Complete terminal configuration.
#[derive(Debug, Clone, Default)]
pub struct TerminalConfig {
    /// Listener settings.
    pub server: ServerSettings,
    /// Exchange feed settings.
    pub feed: FeedSettings,
    /// Per-session settings.
    pub session: SessionSettings,
    /// Display settings.
    pub display: DisplaySettings,
}

impl TerminalConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// Unset or unparsable values fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a capacity or interval is zero, or the feed URL
    /// is not a WebSocket URL.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);
        let server_defaults = ServerSettings::default();
        let feed_defaults = FeedSettings::default();
        let session_defaults = SessionSettings::default();
        let display_defaults = DisplaySettings::default();

        let server = ServerSettings {
            listen_addr: env
                .string("TICKER_LISTEN_ADDR")
                .unwrap_or(server_defaults.listen_addr),
            port: env.parse("TICKER_PORT", server_defaults.port),
            health_port: env.parse("TICKER_HEALTH_PORT", server_defaults.health_port),
        };

        let feed = FeedSettings {
            url: env.string("TICKER_FEED_URL").unwrap_or(feed_defaults.url),
            keepalive_interval: env.secs(
                "TICKER_KEEPALIVE_SECS",
                feed_defaults.keepalive_interval,
            ),
            read_deadline: env.secs("TICKER_READ_DEADLINE_SECS", feed_defaults.read_deadline),
            ping_write_deadline: env.secs(
                "TICKER_PING_WRITE_DEADLINE_SECS",
                feed_defaults.ping_write_deadline,
            ),
            backoff_cap: env.secs("TICKER_BACKOFF_CAP_SECS", feed_defaults.backoff_cap),
            backoff_base: env.parse("TICKER_BACKOFF_BASE", feed_defaults.backoff_base),
            backoff_exponent_cap: env.parse(
                "TICKER_BACKOFF_EXPONENT_CAP",
                feed_defaults.backoff_exponent_cap,
            ),
            max_reconnect_attempts: env.parse(
                "TICKER_MAX_RECONNECT_ATTEMPTS",
                feed_defaults.max_reconnect_attempts,
            ),
        };

        let session = SessionSettings {
            queue_capacity: env.parse("TICKER_QUEUE_CAPACITY", session_defaults.queue_capacity),
            history_capacity: env.parse(
                "TICKER_HISTORY_CAPACITY",
                session_defaults.history_capacity,
            ),
            default_width: env.parse("TICKER_DEFAULT_WIDTH", session_defaults.default_width),
            default_height: env.parse("TICKER_DEFAULT_HEIGHT", session_defaults.default_height),
        };

        let display = DisplaySettings {
            czk_rate: env.parse("TICKER_CZK_RATE", display_defaults.czk_rate),
        };

        let config = Self {
            server,
            feed,
            session,
            display,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.feed.url.starts_with("ws://") || self.feed.url.starts_with("wss://")) {
            return Err(ConfigError::InvalidValue {
                key: "TICKER_FEED_URL",
                reason: "must be a ws:// or wss:// URL",
            });
        }

        let non_zero = [
            ("TICKER_QUEUE_CAPACITY", self.session.queue_capacity == 0),
            ("TICKER_HISTORY_CAPACITY", self.session.history_capacity == 0),
            ("TICKER_KEEPALIVE_SECS", self.feed.keepalive_interval.is_zero()),
            ("TICKER_READ_DEADLINE_SECS", self.feed.read_deadline.is_zero()),
            (
                "TICKER_PING_WRITE_DEADLINE_SECS",
                self.feed.ping_write_deadline.is_zero(),
            ),
        ];
        if let Some((key, _)) = non_zero.into_iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::InvalidValue {
                key,
                reason: "must be greater than zero",
            });
        }

        if self.feed.backoff_base < 2 {
            return Err(ConfigError::InvalidValue {
                key: "TICKER_BACKOFF_BASE",
                reason: "must be at least 2",
            });
        }

        Ok(())
    }

    /// Terminal host bind address.
    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.listen_addr, self.server.port)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value was present but rejected.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Environment variable name.
        key: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn string(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.string(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn secs(&self, key: &str, default: Duration) -> Duration {
        self.string(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }
}
