//! Exchange WebSocket Message Types
//!
//! Wire format for the Binance individual-symbol mini-ticker stream.
//!
//! # Wire Format (JSON)
//!
//! ```json
//! {
//!   "e": "24hrMiniTicker",
//!   "E": 1672515782136,
//!   "s": "BTCUSDT",
//!   "c": "16545.31000000",
//!   "o": "16400.00000000",
//!   "h": "16600.00000000",
//!   "l": "16350.00000000",
//!   "v": "12345.67800000",
//!   "q": "204000000.00000000"
//! }
//! ```
//!
//! Only `c` (close, i.e. the current price) is consumed. Everything else is
//! optional and unknown fields are ignored.
//!
//! # References
//!
//! - [Individual Symbol Mini Ticker Stream](https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams)

use serde::{Deserialize, Serialize};

/// Default mini-ticker endpoint for BTC/USDT.
pub const DEFAULT_FEED_URL: &str = "wss://stream.binance.com:9443/ws/btcusdt@miniTicker";

/// 24h rolling mini-ticker frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniTickerMessage {
    /// Event type (`24hrMiniTicker`).
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    /// Symbol, e.g. `BTCUSDT`.
    #[serde(rename = "s", default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Current price as a decimal string.
    #[serde(rename = "c")]
    pub close_price: String,
}

impl MiniTickerMessage {
    /// Create a frame carrying only a close price.
    #[must_use]
    pub fn with_close(close_price: impl Into<String>) -> Self {
        Self {
            event_type: Some("24hrMiniTicker".to_string()),
            symbol: Some("BTCUSDT".to_string()),
            close_price: close_price.into(),
        }
    }
}
