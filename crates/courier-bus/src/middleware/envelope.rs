//! Envelope-stamping middleware: message id, timestamp, delivery mode and
//! correlation id. Each one only fills in what is missing.

use super::{Middleware, Next};
use crate::config::BusConfig;
use courier_types::{DeliveryMode, Envelope};
use rand::RngCore;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Assigns a random hex message id when the envelope has none.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeIdMiddleware {
    length: usize,
}

impl EnvelopeIdMiddleware {
    /// Fewest random bytes behind a generated id.
    pub const MIN_LENGTH: usize = 4;

    /// `length` random bytes per id, raised to [`Self::MIN_LENGTH`].
    #[must_use]
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(Self::MIN_LENGTH),
        }
    }

    #[must_use]
    pub fn with_config(config: &BusConfig) -> Self {
        Self::new(config.envelope_id_length)
    }

    #[must_use]
    pub fn length(&self) -> usize {
        self.length
    }
}

impl Default for EnvelopeIdMiddleware {
    fn default() -> Self {
        Self::new(crate::DEFAULT_ENVELOPE_ID_LENGTH)
    }
}

impl Middleware for EnvelopeIdMiddleware {
    fn handle(&self, envelope: Envelope, next: Next<'_>) {
        if !envelope.message_id().is_empty() {
            return next.run(envelope);
        }
        let mut bytes = vec![0u8; self.length];
        rand::thread_rng().fill_bytes(&mut bytes);
        next.run(envelope.with_message_id(hex::encode(bytes)));
    }
}

/// Stamps the current unix time when the envelope has no timestamp.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvelopeTimestampMiddleware;

impl Middleware for EnvelopeTimestampMiddleware {
    fn handle(&self, envelope: Envelope, next: Next<'_>) {
        if envelope.timestamp().is_some() {
            return next.run(envelope);
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        next.run(envelope.with_timestamp(Some(now)));
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PersistentDeliveryMiddleware;

impl Middleware for PersistentDeliveryMiddleware {
    fn handle(&self, envelope: Envelope, next: Next<'_>) {
        next.run(envelope.with_delivery_mode(DeliveryMode::Persistent));
    }
}

/// Assigns a UUID v4 correlation id when the envelope has none.
#[derive(Debug, Default, Clone, Copy)]
pub struct CorrelationIdMiddleware;

impl Middleware for CorrelationIdMiddleware {
    fn handle(&self, envelope: Envelope, next: Next<'_>) {
        if envelope.correlation_id().is_empty() {
            next.run(envelope.with_correlation_id(Uuid::new_v4().to_string()));
        } else {
            next.run(envelope);
        }
    }
}
