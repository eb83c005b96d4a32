//! # Transport Contract
//!
//! The boundary between the messaging core and a queueing backend.
//!
//! ## Delivery lifecycle
//!
//! ```text
//! send(routing_key) ──► bound queues ──► recv(queue) ──► in flight
//!                                                         │
//!                           accept ◄──────────────────────┤
//!                           reject(requeue = false) ◄─────┤
//!                           reject(requeue = true) ───────┴──► back to pending
//! ```
//!
//! A delivery tag is stamped on every received envelope and is the only
//! handle accepted by [`Transport::accept`] and [`Transport::reject`].

pub mod memory;

pub use memory::InMemoryTransport;

use courier_types::{Envelope, HandlerResult, TransportError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type TransportResult<T> = Result<T, TransportError>;

/// Header carrying how many times an envelope was requeued.
pub const REDELIVERY_COUNT_HEADER: &str = "x-redelivery-count";

/// Callback invoked per envelope by [`Transport::consume`].
pub type OnMessage<'a> = dyn FnMut(&Envelope, &str) -> HandlerResult + 'a;

/// Stop predicate polled by [`Transport::consume`] between deliveries.
pub type ShouldStop<'a> = dyn FnMut(&ConsumeStats) -> bool + 'a;

pub trait Transport {
    /// Prepare the backend. Called once before use.
    fn init(&self) -> TransportResult<()>;

    /// Deliver messages published under `routing_key` to `queue`.
    fn bind_queue(&self, queue: &str, routing_key: &str) -> TransportResult<()>;

    fn unbind_queue(&self, queue: &str, routing_key: &str) -> TransportResult<()>;

    /// Number of envelopes waiting in `queue` (in-flight ones excluded).
    fn pending(&self, queue: &str) -> TransportResult<usize>;

    /// Drop every pending envelope of `queue`, returning how many were dropped.
    fn purge(&self, queue: &str) -> TransportResult<usize>;

    /// Publish to every queue bound to `routing_key`.
    fn send(&self, routing_key: &str, envelope: Envelope) -> TransportResult<()>;

    /// Take the oldest pending envelope of `queue`, stamped with a fresh
    /// delivery tag.
    fn recv(&self, queue: &str) -> TransportResult<Option<Envelope>>;

    fn accept(&self, envelope: &Envelope) -> TransportResult<()>;

    fn reject(&self, envelope: &Envelope, requeue: bool) -> TransportResult<()>;

    /// Add `queue` to the set served by [`Transport::consume`].
    fn subscribe(&self, queue: &str) -> TransportResult<()>;

    /// Push-style consumption of `queue` and every subscribed queue.
    ///
    /// Each envelope is handed to `on_message` and acknowledged from its
    /// result. Returns the number of envelopes consumed once `should_stop`
    /// answers true or no queue has anything left.
    fn consume(
        &self,
        queue: &str,
        on_message: &mut OnMessage<'_>,
        should_stop: &mut ShouldStop<'_>,
    ) -> TransportResult<usize>;
}

/// Delivery counters of one consume run.
///
/// `requeued` counts every delivery answered with Requeue, including one the
/// transport dead-lettered for exceeding the redelivery cap. Such an envelope
/// leaves `pending` like a rejected one, so the queue balances as
/// `initial - accepted - rejected - dead-lettered`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumeStats {
    pub accepted: usize,
    pub rejected: usize,
    pub requeued: usize,
    pub consumed: usize,
}

impl ConsumeStats {
    /// Count one acknowledged delivery.
    pub fn record(&mut self, result: HandlerResult) {
        match result {
            HandlerResult::Accept => self.accepted += 1,
            HandlerResult::Reject => self.rejected += 1,
            HandlerResult::Requeue => self.requeued += 1,
        }
        self.consumed += 1;
    }
}

/// Where a requeued envelope re-enters its queue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequeuePosition {
    #[default]
    Tail,
    Head,
}

impl FromStr for RequeuePosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tail" => Ok(Self::Tail),
            "head" => Ok(Self::Head),
            other => Err(format!("unknown requeue position \"{other}\"")),
        }
    }
}

/// Requeue behaviour of a transport.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequeuePolicy {
    pub position: RequeuePosition,
    /// Requeues allowed per envelope before it is dead-lettered. `None` means
    /// unlimited.
    pub max_redeliveries: Option<u32>,
}
