//! Bus configuration from environment variables.

use crate::transport::{RequeuePolicy, RequeuePosition};
use crate::{DEFAULT_BUFFER_SIZE, DEFAULT_ENVELOPE_ID_LENGTH};
use std::env;

/// Tunables for producers, the envelope id middleware and the in-memory
/// transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    /// Messages per kind held by a buffered producer before it flushes
    pub buffer_size: usize,

    /// Random bytes behind generated envelope ids
    pub envelope_id_length: usize,

    /// Where requeued envelopes re-enter their queue
    pub requeue_position: RequeuePosition,

    /// Requeues allowed per envelope before dead-lettering (None = unlimited)
    pub max_redeliveries: Option<u32>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            envelope_id_length: DEFAULT_ENVELOPE_ID_LENGTH,
            requeue_position: RequeuePosition::Tail,
            max_redeliveries: None,
        }
    }
}

impl BusConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `COURIER_BUFFER_SIZE`: Buffered producer size (default: 10, minimum: 1)
    /// - `COURIER_ENVELOPE_ID_LENGTH`: Envelope id bytes (default: 10, minimum: 4)
    /// - `COURIER_REQUEUE_POSITION`: `tail` or `head` (default: tail)
    /// - `COURIER_MAX_REDELIVERIES`: Redelivery cap (default: unlimited)
    ///
    /// Unparseable values fall back to the default.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            buffer_size: lookup("COURIER_BUFFER_SIZE")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.buffer_size)
                .max(1),

            envelope_id_length: lookup("COURIER_ENVELOPE_ID_LENGTH")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.envelope_id_length)
                .max(4),

            requeue_position: lookup("COURIER_REQUEUE_POSITION")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.requeue_position),

            max_redeliveries: lookup("COURIER_MAX_REDELIVERIES")
                .and_then(|v| v.trim().parse().ok())
                .or(defaults.max_redeliveries),
        }
    }

    #[must_use]
    pub fn requeue_policy(&self) -> RequeuePolicy {
        RequeuePolicy {
            position: self.requeue_position,
            max_redeliveries: self.max_redeliveries,
        }
    }
}
