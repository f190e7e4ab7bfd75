//! Feed State Tracking
//!
//! Observable connection state of one session's feed client.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, Utc};

/// Connection state of a feed client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected (initial state, and after a read error).
    #[default]
    Disconnected,
    /// Dial in progress.
    Connecting,
    /// Subscribed and reading.
    Connected,
    /// Sleeping before the next dial; carries the consecutive-failure count.
    Backoff(u32),
}

impl ConnectionState {
    /// Lowercase label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Backoff(_) => "backoff",
        }
    }
}

/// Tracks the state of a session's upstream feed connection.
#[derive(Debug, Default)]
pub struct FeedState {
    state: parking_lot::RwLock<ConnectionState>,
    last_connected_at: parking_lot::RwLock<Option<DateTime<Utc>>>,
    connects: AtomicU32,
    frames_received: AtomicU64,
    samples_dropped: AtomicU64,
}

impl FeedState {
    /// Create a new tracker in the `Disconnected` state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection state.
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        if state == ConnectionState::Connected {
            *self.last_connected_at.write() = Some(Utc::now());
            self.connects.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Increment the received frame counter.
    pub fn increment_frames(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment the dropped sample counter.
    pub fn increment_dropped(&self) {
        self.samples_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current connection state.
    #[must_use]
    pub fn get_state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Time of the most recent successful connect.
    #[must_use]
    pub fn last_connected_at(&self) -> Option<DateTime<Utc>> {
        *self.last_connected_at.read()
    }

    /// Number of successful connects.
    #[must_use]
    pub fn connects(&self) -> u32 {
        self.connects.load(Ordering::Relaxed)
    }

    /// Frames received across all connections.
    #[must_use]
    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Samples discarded because the channel was full.
    #[must_use]
    pub fn samples_dropped(&self) -> u64 {
        self.samples_dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_disconnected() {
        let state = FeedState::new();
        assert_eq!(state.get_state(), ConnectionState::Disconnected);
        assert!(state.last_connected_at().is_none());
        assert_eq!(state.connects(), 0);
    }

    #[test]
    fn connected_records_timestamp() {
        let state = FeedState::new();
        state.set_state(ConnectionState::Connecting);
        state.set_state(ConnectionState::Connected);

        assert_eq!(state.get_state(), ConnectionState::Connected);
        assert!(state.last_connected_at().is_some());
        assert_eq!(state.connects(), 1);
    }

    #[test]
    fn counters() {
        let state = FeedState::new();
        state.increment_frames();
        state.increment_frames();
        state.increment_dropped();
        assert_eq!(state.frames_received(), 2);
        assert_eq!(state.samples_dropped(), 1);
    }

    #[test]
    fn labels() {
        assert_eq!(ConnectionState::Backoff(3).as_str(), "backoff");
        assert_eq!(ConnectionState::Connected.as_str(), "connected");
    }
}
