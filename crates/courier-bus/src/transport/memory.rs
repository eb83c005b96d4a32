//! # In-Memory Transport
//!
//! Reference [`Transport`] keeping every queue in process memory.
//!
//! - Routing keys fan out to every bound queue, in bind order.
//! - Sending to a routing key with no bound queue is a silent no-op.
//! - Received envelopes stay in flight until accepted or rejected.
//! - Requeue honours the configured [`RequeuePolicy`]; envelopes over the
//!   redelivery cap are moved to the queue's dead letters.
//!
//! Single-threaded: state lives in a `RefCell`, so the transport is `!Sync`.

use super::{
    ConsumeStats, OnMessage, RequeuePolicy, RequeuePosition, ShouldStop, Transport,
    TransportResult, REDELIVERY_COUNT_HEADER,
};
use courier_types::{DeliveryTag, Envelope, HandlerResult, TransportError};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<Envelope>,
    in_flight: HashMap<u64, Envelope>,
    dead_letters: Vec<Envelope>,
}

#[derive(Debug, Default)]
struct State {
    routing: HashMap<String, Vec<String>>,
    queues: HashMap<String, QueueState>,
    subscriptions: Vec<String>,
    sequence: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryTransport {
    policy: RequeuePolicy,
    state: RefCell<State>,
}

impl InMemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_policy(policy: RequeuePolicy) -> Self {
        Self {
            policy,
            state: RefCell::default(),
        }
    }

    #[must_use]
    pub fn policy(&self) -> RequeuePolicy {
        self.policy
    }

    /// Deliveries of `queue` received but not yet acknowledged.
    #[must_use]
    pub fn in_flight(&self, queue: &str) -> usize {
        self.state
            .borrow()
            .queues
            .get(queue)
            .map_or(0, |q| q.in_flight.len())
    }

    /// Envelopes removed from `queue` after exceeding the redelivery cap.
    #[must_use]
    pub fn dead_letters(&self, queue: &str) -> Vec<Envelope> {
        self.state
            .borrow()
            .queues
            .get(queue)
            .map(|q| q.dead_letters.clone())
            .unwrap_or_default()
    }

    /// Queues currently bound to `routing_key`.
    #[must_use]
    pub fn bound_queues(&self, routing_key: &str) -> Vec<String> {
        self.state
            .borrow()
            .routing
            .get(routing_key)
            .cloned()
            .unwrap_or_default()
    }

    /// Return every in-flight delivery of `queue` to the head of its pending
    /// list, oldest first, flagged as redelivered. Their tags become invalid.
    pub fn recover(&self, queue: &str) -> usize {
        let mut state = self.state.borrow_mut();
        let Some(queue_state) = state.queues.get_mut(queue) else {
            return 0;
        };

        let mut deliveries: Vec<(u64, Envelope)> = queue_state.in_flight.drain().collect();
        deliveries.sort_by_key(|(sequence, _)| *sequence);
        let recovered = deliveries.len();
        for (_, envelope) in deliveries.into_iter().rev() {
            queue_state.pending.push_front(envelope.with_redelivery(true));
        }

        if recovered > 0 {
            debug!(queue, recovered, "Recovered unacknowledged deliveries");
        }
        recovered
    }

    fn settle(&self, envelope: &Envelope, requeue: bool) -> TransportResult<()> {
        let tag = envelope
            .delivery_tag()
            .ok_or(TransportError::MissingDeliveryTag)?;

        let mut state = self.state.borrow_mut();
        let unknown = || TransportError::UnknownDeliveryTag {
            tag: tag.to_string(),
        };
        let queue = state.queues.get_mut(tag.queue()).ok_or_else(unknown)?;
        let original = queue.in_flight.remove(&tag.sequence()).ok_or_else(unknown)?;

        if !requeue {
            return Ok(());
        }

        let count = original
            .header(REDELIVERY_COUNT_HEADER)
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0)
            + 1;
        if let Some(max) = self.policy.max_redeliveries {
            if count > u64::from(max) {
                warn!(
                    queue = tag.queue(),
                    message_id = original.message_id(),
                    redeliveries = count - 1,
                    "Redelivery limit reached, dead-lettering envelope"
                );
                queue.dead_letters.push(original);
                return Ok(());
            }
        }

        let requeued = original
            .with_redelivery(true)
            .with_header(REDELIVERY_COUNT_HEADER, count);
        match self.policy.position {
            RequeuePosition::Tail => queue.pending.push_back(requeued),
            RequeuePosition::Head => queue.pending.push_front(requeued),
        }
        Ok(())
    }
}

impl Transport for InMemoryTransport {
    fn init(&self) -> TransportResult<()> {
        Ok(())
    }

    fn bind_queue(&self, queue: &str, routing_key: &str) -> TransportResult<()> {
        let mut state = self.state.borrow_mut();
        state.queues.entry(queue.to_string()).or_default();

        let bound = state.routing.entry(routing_key.to_string()).or_default();
        if !bound.iter().any(|q| q == queue) {
            bound.push(queue.to_string());
            debug!(queue, routing_key, "Queue bound");
        }
        Ok(())
    }

    /// Pending envelopes of the queue are kept.
    fn unbind_queue(&self, queue: &str, routing_key: &str) -> TransportResult<()> {
        let mut state = self.state.borrow_mut();
        if let Some(bound) = state.routing.get_mut(routing_key) {
            bound.retain(|q| q != queue);
            if bound.is_empty() {
                state.routing.remove(routing_key);
            }
        }
        Ok(())
    }

    fn pending(&self, queue: &str) -> TransportResult<usize> {
        Ok(self
            .state
            .borrow()
            .queues
            .get(queue)
            .map_or(0, |q| q.pending.len()))
    }

    fn purge(&self, queue: &str) -> TransportResult<usize> {
        let mut state = self.state.borrow_mut();
        Ok(state.queues.get_mut(queue).map_or(0, |q| {
            let purged = q.pending.len();
            q.pending.clear();
            purged
        }))
    }

    fn send(&self, routing_key: &str, envelope: Envelope) -> TransportResult<()> {
        let mut state = self.state.borrow_mut();
        let Some(bound) = state.routing.get(routing_key).cloned() else {
            debug!(routing_key, "No queue bound, envelope dropped");
            return Ok(());
        };

        let envelope = envelope.without_delivery_tag();
        for queue in bound {
            state
                .queues
                .entry(queue)
                .or_default()
                .pending
                .push_back(envelope.clone());
        }
        Ok(())
    }

    fn recv(&self, queue: &str) -> TransportResult<Option<Envelope>> {
        let mut state = self.state.borrow_mut();
        state.sequence += 1;
        let sequence = state.sequence;

        let Some(queue_state) = state.queues.get_mut(queue) else {
            return Ok(None);
        };
        let Some(envelope) = queue_state.pending.pop_front() else {
            return Ok(None);
        };

        queue_state.in_flight.insert(sequence, envelope.clone());
        Ok(Some(envelope.with_delivery_tag(DeliveryTag::new(sequence, queue))))
    }

    fn accept(&self, envelope: &Envelope) -> TransportResult<()> {
        self.settle(envelope, false)
    }

    fn reject(&self, envelope: &Envelope, requeue: bool) -> TransportResult<()> {
        self.settle(envelope, requeue)
    }

    fn subscribe(&self, queue: &str) -> TransportResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.subscriptions.iter().any(|q| q == queue) {
            state.subscriptions.push(queue.to_string());
        }
        Ok(())
    }

    fn consume(
        &self,
        queue: &str,
        on_message: &mut OnMessage<'_>,
        should_stop: &mut ShouldStop<'_>,
    ) -> TransportResult<usize> {
        self.subscribe(queue)?;
        let queues = std::mem::take(&mut self.state.borrow_mut().subscriptions);

        let mut stats = ConsumeStats::default();
        'outer: loop {
            let mut received = false;
            for queue in &queues {
                if let Some(envelope) = self.recv(queue)? {
                    received = true;
                    let result = on_message(&envelope, queue);
                    match result {
                        HandlerResult::Accept => self.accept(&envelope)?,
                        HandlerResult::Reject => self.reject(&envelope, false)?,
                        HandlerResult::Requeue => self.reject(&envelope, true)?,
                    }
                    stats.record(result);
                }

                if should_stop(&stats) {
                    break 'outer;
                }
            }

            if !received {
                break;
            }
        }

        Ok(stats.consumed)
    }
}
