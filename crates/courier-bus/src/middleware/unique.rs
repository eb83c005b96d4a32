//! # Duplicate Suppression
//!
//! Drops envelopes whose message id was already seen within a time window.
//!
//! - Ids are remembered for `ttl` after first sight
//! - Expired ids are garbage-collected periodically, bounding memory
//! - Envelopes without a message id are never suppressed
//! - Redeliveries (requeued or recovered) carry an id already seen and pass

use super::{Middleware, Next};
use courier_types::Envelope;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

struct SeenIds {
    /// message id -> instant it stops counting as a duplicate
    expires: HashMap<String, Instant>,
    last_gc: Instant,
}

pub struct UniqueEnvelopeMiddleware {
    ttl: Duration,
    gc_interval: Duration,
    seen: Mutex<SeenIds>,
}

impl UniqueEnvelopeMiddleware {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(120);

    pub const DEFAULT_GC_INTERVAL: Duration = Duration::from_secs(10);

    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_config(ttl, Self::DEFAULT_GC_INTERVAL)
    }

    #[must_use]
    pub fn with_config(ttl: Duration, gc_interval: Duration) -> Self {
        Self {
            ttl,
            gc_interval,
            seen: Mutex::new(SeenIds {
                expires: HashMap::new(),
                last_gc: Instant::now(),
            }),
        }
    }

    /// Record `message_id`; false when it was already seen and has not
    /// expired yet.
    pub fn check_and_record(&self, message_id: &str) -> bool {
        let now = Instant::now();
        let mut seen = self.seen.lock();

        if now.duration_since(seen.last_gc) > self.gc_interval {
            seen.expires.retain(|_, expires_at| *expires_at > now);
            seen.last_gc = now;
        }

        if seen.expires.get(message_id).is_some_and(|expires_at| *expires_at > now) {
            return false;
        }
        seen.expires.insert(message_id.to_string(), now + self.ttl);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().expires.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UniqueEnvelopeMiddleware {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}

impl Middleware for UniqueEnvelopeMiddleware {
    fn handle(&self, envelope: Envelope, next: Next<'_>) {
        if envelope.message_id().is_empty() {
            debug!(message_type = envelope.message_type(), "No message id, skipping duplicate check");
            return next.run(envelope);
        }
        if envelope.is_redelivery() {
            debug!(message_id = envelope.message_id(), "Redelivery, skipping duplicate check");
            return next.run(envelope);
        }
        if self.check_and_record(envelope.message_id()) {
            next.run(envelope);
        } else {
            warn!(message_id = envelope.message_id(), "Dropping duplicate envelope");
        }
    }
}
