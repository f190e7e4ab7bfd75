//! Feed WebSocket Client
//!
//! Maintains one resilient subscription to the exchange mini-ticker stream
//! and pushes parsed prices into a session's sample channel.
//!
//! # Stream URL
//!
//! - Default: `wss://stream.binance.com:9443/ws/btcusdt@miniTicker`
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected ─► Connecting ─┬─► Connected ──(read error)──► Disconnected
//!                             └─► Backoff(n) ──(sleep)──────► Connecting
//! ```
//!
//! Cancellation is observed while dialing, reading and sleeping. When
//! [`StreamClient::run`] returns the client is dropped, which closes the
//! sample channel.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;

use super::channel::{OfferOutcome, SampleSender};
use super::codec::JsonCodec;
use super::heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatManager, HeartbeatState};
use super::messages::DEFAULT_FEED_URL;
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use super::state::{ConnectionState, FeedState};
use crate::infrastructure::metrics;

/// Largest accepted inbound message.
pub const MAX_MESSAGE_SIZE: usize = 1 << 20;

const PING_PAYLOAD: &[u8] = b"ping";

// =============================================================================
// Error Type
// =============================================================================

/// Errors that end a single connection.
#[derive(Debug, thiserror::Error)]
pub enum StreamClientError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// No frame arrived within the read deadline.
    #[error("no frame received for {0:?}")]
    ReadDeadlineExceeded(Duration),

    /// Maximum reconnection attempts exceeded.
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectAttemptsExceeded,

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the feed client.
#[derive(Debug, Clone)]
pub struct StreamClientConfig {
    /// WebSocket URL.
    pub url: String,
    /// Reconnection configuration.
    pub reconnect: ReconnectConfig,
    /// Heartbeat configuration.
    pub heartbeat: HeartbeatConfig,
}

impl Default for StreamClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_URL.to_string())
    }
}

impl StreamClientConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(url: String) -> Self {
        Self {
            url,
            reconnect: ReconnectConfig::default(),
            heartbeat: HeartbeatConfig::default(),
        }
    }

    /// Create configuration from `FeedSettings`.
    #[must_use]
    pub fn from_feed_settings(settings: &crate::FeedSettings) -> Self {
        Self {
            url: settings.url.clone(),
            reconnect: ReconnectConfig::from_feed_settings(settings),
            heartbeat: HeartbeatConfig::from_feed_settings(settings),
        }
    }
}

// =============================================================================
// Stream Client
// =============================================================================

/// Feed client bound to one session.
///
/// Manages the connection lifecycle including:
/// - Exponential backoff on dial failure (interruptible)
/// - Keepalive pings and a read deadline refreshed by every frame
/// - Lossy, non-blocking delivery into the sample channel
pub struct StreamClient {
    config: StreamClientConfig,
    codec: JsonCodec,
    sender: SampleSender,
    cancel: CancellationToken,
    state: Arc<FeedState>,
}

impl StreamClient {
    /// Create a new feed client.
    #[must_use]
    pub fn new(
        config: StreamClientConfig,
        sender: SampleSender,
        cancel: CancellationToken,
        state: Arc<FeedState>,
    ) -> Self {
        Self {
            config,
            codec: JsonCodec::new(),
            sender,
            cancel,
            state,
        }
    }

    /// Run the connect/read loop until cancelled.
    ///
    /// Returns `Ok(())` on cancellation or when the consumer goes away.
    /// Consuming `self` closes the sample channel on return.
    ///
    /// # Errors
    ///
    /// Returns `MaxReconnectAttemptsExceeded` only when the reconnect
    /// configuration sets a finite attempt budget.
    pub async fn run(self) -> Result<(), StreamClientError> {
        let mut reconnect_policy = ReconnectPolicy::new(self.config.reconnect.clone());

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Feed client cancelled");
                break;
            }

            self.state.set_state(ConnectionState::Connecting);
            tracing::debug!(url = %self.config.url, "Connecting to feed");

            let ws_config = WebSocketConfig::default()
                .max_message_size(Some(MAX_MESSAGE_SIZE))
                .max_frame_size(Some(MAX_MESSAGE_SIZE));

            let connect = tokio::select! {
                () = self.cancel.cancelled() => {
                    tracing::info!("Feed client cancelled while connecting");
                    break;
                }
                result = tokio_tungstenite::connect_async_with_config(
                    self.config.url.as_str(),
                    Some(ws_config),
                    false,
                ) => result,
            };

            match connect {
                Ok((ws_stream, _response)) => {
                    reconnect_policy.reset();
                    self.state.set_state(ConnectionState::Connected);
                    metrics::set_feed_connected(true);
                    tracing::info!("Connected to feed");

                    let result = self.read_loop(ws_stream).await;

                    metrics::set_feed_connected(false);
                    self.state.set_state(ConnectionState::Disconnected);

                    match result {
                        Ok(()) => break,
                        Err(e) => {
                            metrics::record_feed_error(error_kind(&e));
                            tracing::warn!(error = %e, "Feed read error");
                        }
                    }
                }
                Err(e) => {
                    self.state.set_state(ConnectionState::Disconnected);
                    metrics::record_feed_error("connect");

                    let Some(delay) = reconnect_policy.next_delay() else {
                        return Err(StreamClientError::MaxReconnectAttemptsExceeded);
                    };
                    let attempt = reconnect_policy.attempt_count();
                    metrics::record_reconnect();
                    self.state.set_state(ConnectionState::Backoff(attempt));

                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis(),
                        "Feed connect failed, backing off"
                    );

                    tokio::select! {
                        () = self.cancel.cancelled() => {
                            tracing::info!("Feed client cancelled during backoff");
                            break;
                        }
                        () = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }

        Ok(())
    }

    /// Read frames until error, cancellation or consumer shutdown.
    ///
    /// Every await in the loop, including a pending ping write, yields to
    /// cancellation.
    async fn read_loop<S>(&self, transport: S) -> Result<(), StreamClientError>
    where
        S: Stream<Item = Result<Message, WsError>> + Sink<Message, Error = WsError>,
    {
        let (mut write, mut read) = transport.split();

        let heartbeat = &self.config.heartbeat;
        let heartbeat_state = HeartbeatState::new();
        let (heartbeat_tx, mut heartbeat_rx) = mpsc::channel::<HeartbeatEvent>(1);
        let heartbeat_cancel = self.cancel.child_token();
        let heartbeat_manager =
            HeartbeatManager::new(heartbeat.clone(), heartbeat_tx, heartbeat_cancel.clone());
        let _heartbeat_handle = tokio::spawn(heartbeat_manager.run());

        let result = loop {
            let deadline = heartbeat_state.read_deadline(heartbeat.read_deadline);

            tokio::select! {
                () = self.cancel.cancelled() => break Ok(()),
                () = tokio::time::sleep_until(deadline) => {
                    break Err(StreamClientError::ReadDeadlineExceeded(heartbeat.read_deadline));
                }
                Some(HeartbeatEvent::SendPing) = heartbeat_rx.recv() => {
                    let ping = write.send(Message::Ping(PING_PAYLOAD.to_vec().into()));
                    tokio::select! {
                        () = self.cancel.cancelled() => break Ok(()),
                        written = tokio::time::timeout(heartbeat.ping_write_deadline, ping) => {
                            match written {
                                Ok(Ok(())) => heartbeat_state.mark_ping_sent(),
                                Ok(Err(e)) => tracing::debug!(error = %e, "Ping write failed"),
                                Err(_) => tracing::debug!("Ping write timed out"),
                            }
                        }
                    }
                }
                msg = read.next() => {
                    let Some(msg) = msg else {
                        tracing::info!("Feed stream ended");
                        break Err(StreamClientError::ConnectionClosed);
                    };

                    let msg = match msg {
                        Ok(msg) => msg,
                        Err(e) => break Err(e.into()),
                    };
                    heartbeat_state.record_frame();
                    self.state.increment_frames();

                    let decoded = match msg {
                        Message::Text(text) => Some(self.codec.decode_price(&text)),
                        Message::Binary(bytes) => Some(self.codec.decode_price_bytes(&bytes)),
                        Message::Close(frame) => {
                            tracing::info!(?frame, "Feed sent close frame");
                            break Err(StreamClientError::ConnectionClosed);
                        }
                        // Pings are answered by tungstenite; pongs only refresh the deadline.
                        Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
                    };

                    match decoded {
                        Some(Ok(price)) => {
                            tracing::trace!(price, "Price received");
                            match self.sender.offer(price) {
                                OfferOutcome::Delivered => {}
                                OfferOutcome::Dropped => self.state.increment_dropped(),
                                OfferOutcome::Closed => {
                                    tracing::debug!("Sample consumer dropped, stopping feed");
                                    break Ok(());
                                }
                            }
                        }
                        Some(Err(e)) => {
                            metrics::record_parse_failure();
                            tracing::debug!(error = %e, "Dropping unparsable feed message");
                        }
                        None => {}
                    }
                }
            }
        };

        heartbeat_cancel.cancel();
        tracing::debug!(
            pings = heartbeat_state.pings_sent(),
            silent_ms = heartbeat_state.time_since_frame().as_millis(),
            "Feed read loop ended"
        );

        // A cancelled client drops the socket instead of waiting on a close
        // handshake.
        if !self.cancel.is_cancelled()
            && let Err(e) = tokio::time::timeout(heartbeat.ping_write_deadline, write.close()).await
        {
            tracing::debug!(error = %e, "Feed close timed out");
        }

        result
    }
}

const fn error_kind(error: &StreamClientError) -> &'static str {
    match error {
        StreamClientError::WebSocket(_) => "websocket",
        StreamClientError::ReadDeadlineExceeded(_) => "read_deadline",
        StreamClientError::MaxReconnectAttemptsExceeded => "max_reconnects",
        StreamClientError::ConnectionClosed => "closed",
    }
}
