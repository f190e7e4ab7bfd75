//! Sample Channel
//!
//! Bounded, lossy single-consumer queue between a feed client and its
//! session. The producer never waits: when the queue is full the incoming
//! (newest) sample is discarded. Dropping the sender closes the channel.

use tokio::sync::mpsc;

use crate::domain::history::PriceSample;
use crate::infrastructure::metrics;

/// Default queue capacity per session.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Result of offering a sample to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// The sample was queued.
    Delivered,
    /// The queue was full; the sample was discarded.
    Dropped,
    /// The consumer is gone.
    Closed,
}

/// Create a sample channel with the given capacity (minimum 1).
#[must_use]
pub fn sample_channel(capacity: usize) -> (SampleSender, SampleReceiver) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    (SampleSender { tx }, SampleReceiver { rx, capacity })
}

/// Producer half, owned by the feed client.
#[derive(Debug)]
pub struct SampleSender {
    tx: mpsc::Sender<PriceSample>,
}

impl SampleSender {
    /// Queue a sample without waiting.
    pub fn offer(&self, sample: PriceSample) -> OfferOutcome {
        match self.tx.try_send(sample) {
            Ok(()) => {
                metrics::record_sample_received();
                OfferOutcome::Delivered
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::record_sample_dropped();
                OfferOutcome::Dropped
            }
            Err(mpsc::error::TrySendError::Closed(_)) => OfferOutcome::Closed,
        }
    }

    /// Whether the consumer has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the session controller.
#[derive(Debug)]
pub struct SampleReceiver {
    rx: mpsc::Receiver<PriceSample>,
    capacity: usize,
}

impl SampleReceiver {
    /// Wait for the next sample; `None` once the channel is closed and drained.
    pub async fn recv(&mut self) -> Option<PriceSample> {
        self.rx.recv().await
    }

    /// Take a queued sample without waiting.
    ///
    /// # Errors
    ///
    /// Returns `Empty` when nothing is queued and `Disconnected` once the
    /// sender is gone and the queue is drained.
    pub fn try_recv(&mut self) -> Result<PriceSample, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }

    /// Number of queued samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Maximum number of queued samples.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether the producer has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}
