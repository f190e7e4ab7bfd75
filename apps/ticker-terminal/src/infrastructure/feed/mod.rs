//! Exchange Feed Adapters
//!
//! WebSocket client for the exchange's public mini-ticker stream and the
//! pieces it is built from:
//!
//! - **client**: connect/read/reconnect loop bound to one session
//! - **channel**: bounded, lossy hand-off of prices to the session
//! - **codec**: JSON frame to price decoding
//! - **heartbeat**: keepalive pings and read deadline
//! - **reconnect**: capped exponential backoff

pub mod channel;
pub mod client;
pub mod codec;
pub mod heartbeat;
pub mod messages;
pub mod reconnect;
pub mod state;

pub use channel::{OfferOutcome, SampleReceiver, SampleSender, sample_channel};
pub use client::{StreamClient, StreamClientConfig, StreamClientError};
pub use codec::{CodecError, JsonCodec};
pub use heartbeat::{HeartbeatConfig, HeartbeatEvent, HeartbeatManager, HeartbeatState};
pub use messages::{DEFAULT_FEED_URL, MiniTickerMessage};
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use state::{ConnectionState, FeedState};
