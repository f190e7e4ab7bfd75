//! Session Registry
//!
//! Bookkeeping of live sessions for health reporting. Holds each session's
//! feed state handle and open time; never any price data.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::infrastructure::feed::{ConnectionState, FeedState};
use crate::infrastructure::metrics;

/// Unique identifier for a terminal session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What the registry knows about one live session.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    /// When the session was opened.
    pub opened_at: DateTime<Utc>,
    /// Remote peer, when the host knows it.
    pub peer: Option<String>,
    /// The session's upstream feed state.
    pub feed: Arc<FeedState>,
}

/// Aggregate view used by the health endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Sessions currently open.
    pub active: usize,
    /// Open sessions whose feed is connected.
    pub feeds_connected: usize,
    /// Sessions opened since start.
    pub total: u64,
}

/// Registry of live sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionInfo>>,
    total: AtomicU64,
    accepting: AtomicBool,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly opened session.
    pub fn register(&self, id: SessionId, peer: Option<String>, feed: Arc<FeedState>) {
        let info = SessionInfo {
            opened_at: Utc::now(),
            peer,
            feed,
        };
        self.sessions.write().insert(id, info);
        self.total.fetch_add(1, Ordering::Relaxed);
        metrics::record_session_opened();
    }

    /// Forget a session. Returns `false` if it was not registered.
    pub fn deregister(&self, id: SessionId) -> bool {
        let removed = self.sessions.write().remove(&id).is_some();
        if removed {
            metrics::record_session_closed();
        }
        removed
    }

    /// Every open session, oldest first.
    #[must_use]
    pub fn sessions(&self) -> Vec<(SessionId, SessionInfo)> {
        let mut sessions: Vec<_> = self
            .sessions
            .read()
            .iter()
            .map(|(id, info)| (*id, info.clone()))
            .collect();
        sessions.sort_by_key(|(_, info)| info.opened_at);
        sessions
    }

    /// Number of open sessions.
    #[must_use]
    pub fn active(&self) -> usize {
        self.sessions.read().len()
    }

    /// Snapshot of counts.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let sessions = self.sessions.read();
        let feeds_connected = sessions
            .values()
            .filter(|info| info.feed.get_state() == ConnectionState::Connected)
            .count();

        RegistryStats {
            active: sessions.len(),
            feeds_connected,
            total: self.total.load(Ordering::Relaxed),
        }
    }

    /// Mark whether the terminal host is accepting connections.
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::Relaxed);
    }

    /// Whether the terminal host is accepting connections.
    #[must_use]
    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::Relaxed)
    }
}
