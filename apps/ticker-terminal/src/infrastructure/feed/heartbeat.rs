//! Heartbeat Manager
//!
//! Keeps the feed connection alive with periodic ping frames and tracks
//! when the last inbound frame arrived, which drives the read deadline.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Configuration for heartbeat behavior.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between ping frames.
    pub ping_interval: Duration,
    /// Maximum silence on the socket before the connection is considered dead.
    pub read_deadline: Duration,
    /// Upper bound on writing a single ping frame.
    pub ping_write_deadline: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(45),
            read_deadline: Duration::from_secs(90),
            ping_write_deadline: Duration::from_secs(5),
        }
    }
}

impl HeartbeatConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(
        ping_interval: Duration,
        read_deadline: Duration,
        ping_write_deadline: Duration,
    ) -> Self {
        Self {
            ping_interval,
            read_deadline,
            ping_write_deadline,
        }
    }

    /// Create configuration from `FeedSettings`.
    #[must_use]
    pub const fn from_feed_settings(settings: &crate::FeedSettings) -> Self {
        Self {
            ping_interval: settings.keepalive_interval,
            read_deadline: settings.read_deadline,
            ping_write_deadline: settings.ping_write_deadline,
        }
    }
}

/// Events emitted by the heartbeat manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatEvent {
    /// Request to send a ping frame.
    SendPing,
}

/// Per-connection liveness: when the last frame arrived and how many pings
/// went out. A fresh value is created for every connection.
#[derive(Debug)]
pub struct HeartbeatState {
    last_frame: RwLock<Instant>,
    pings_sent: AtomicU64,
}

impl Default for HeartbeatState {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatState {
    /// Start the clock at now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_frame: RwLock::new(Instant::now()),
            pings_sent: AtomicU64::new(0),
        }
    }

    /// Record that a frame (data or control) was received.
    pub fn record_frame(&self) {
        *self.last_frame.write() = Instant::now();
    }

    /// Record that a ping was written.
    pub fn mark_ping_sent(&self) {
        self.pings_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of pings written on this connection.
    #[must_use]
    pub fn pings_sent(&self) -> u64 {
        self.pings_sent.load(Ordering::Relaxed)
    }

    /// Silence on the socket so far.
    #[must_use]
    pub fn time_since_frame(&self) -> Duration {
        self.last_frame.read().elapsed()
    }

    /// Instant at which the read deadline expires.
    #[must_use]
    pub fn read_deadline(&self, deadline: Duration) -> Instant {
        *self.last_frame.read() + deadline
    }
}

/// Keepalive timer for one feed connection.
///
/// # Example
///
/// ```rust,no_run
/// use ticker_terminal::infrastructure::feed::heartbeat::{
///     HeartbeatConfig, HeartbeatEvent, HeartbeatManager,
/// };
/// use tokio::sync::mpsc;
/// use tokio_util::sync::CancellationToken;
///
/// async fn example() {
///     let (event_tx, mut event_rx) = mpsc::channel(10);
///     let cancel = CancellationToken::new();
///
///     let manager = HeartbeatManager::new(HeartbeatConfig::default(), event_tx, cancel.clone());
///     tokio::spawn(manager.run());
///
///     while let Some(HeartbeatEvent::SendPing) = event_rx.recv().await {
///         // Write a ping frame
///     }
/// }
/// ```
pub struct HeartbeatManager {
    config: HeartbeatConfig,
    event_tx: mpsc::Sender<HeartbeatEvent>,
    cancel: CancellationToken,
}

impl HeartbeatManager {
    /// Create a new heartbeat manager.
    #[must_use]
    pub const fn new(
        config: HeartbeatConfig,
        event_tx: mpsc::Sender<HeartbeatEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            event_tx,
            cancel,
        }
    }

    /// Run the keepalive loop until cancelled or the event receiver is dropped.
    ///
    /// The first ping is sent one full interval after start.
    pub async fn run(self) {
        let start = Instant::now() + self.config.ping_interval;
        let mut interval = tokio::time::interval_at(start, self.config.ping_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::debug!("Heartbeat manager cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if self.event_tx.send(HeartbeatEvent::SendPing).await.is_err() {
                        tracing::debug!("Event channel closed, stopping heartbeat");
                        break;
                    }
                }
            }
        }
    }
}
