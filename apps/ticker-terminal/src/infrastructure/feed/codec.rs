//! Stream Codec Module
//!
//! Decodes mini-ticker frames into price samples. Decoding failures are
//! recoverable: the client drops the frame and keeps reading.

use crate::domain::history::PriceSample;
use crate::infrastructure::feed::messages::MiniTickerMessage;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// The price field is not a finite decimal number.
    #[error("invalid price: {0:?}")]
    InvalidPrice(String),
}

/// JSON codec for the mini-ticker stream.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a text frame into its current price.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object with a `c` field,
    /// or if `c` does not parse to a finite `f64`.
    pub fn decode_price(&self, text: &str) -> Result<PriceSample, CodecError> {
        let msg: MiniTickerMessage = serde_json::from_str(text)?;
        parse_price(&msg.close_price)
    }

    /// Decode a binary frame carrying UTF-8 JSON.
    ///
    /// # Errors
    ///
    /// Same conditions as [`JsonCodec::decode_price`].
    pub fn decode_price_bytes(&self, bytes: &[u8]) -> Result<PriceSample, CodecError> {
        let msg: MiniTickerMessage = serde_json::from_slice(bytes)?;
        parse_price(&msg.close_price)
    }
}

fn parse_price(raw: &str) -> Result<PriceSample, CodecError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| CodecError::InvalidPrice(raw.to_string()))
}
