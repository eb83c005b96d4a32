//! # Middleware Flow
//!
//! Producer-side stamping and signing, consumer-side verification and
//! duplicate suppression, over the same in-memory transport.

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use courier_bus::middleware::signature::SIGNATURE_HEADER;
    use courier_bus::middleware::{
        CorrelationIdMiddleware, EnvelopeIdMiddleware, EnvelopeTimestampMiddleware,
        PersistentDeliveryMiddleware, SignatureVerificationMiddleware, SignedEnvelopeMiddleware,
        UniqueEnvelopeMiddleware,
    };
    use courier_bus::{
        handler_fn, Bus, BusConfig, Consumer, HandleClassNameInflector, InMemoryLocator,
        InMemoryTransport, MiddlewareChain, Produce, Producer, RequeuePolicy, Transport,
    };
    use courier_types::{Attributes, DeliveryMode, HandlerResult};
    use parking_lot::Mutex;

    use crate::fixtures::*;

    const SIGNING_KEY: &str = "billing-signing-key";

    fn stamping_chain() -> MiddlewareChain {
        let mut chain = MiddlewareChain::new();
        chain
            .add(EnvelopeIdMiddleware::with_config(&BusConfig::default()))
            .add(EnvelopeTimestampMiddleware)
            .add(CorrelationIdMiddleware)
            .add(PersistentDeliveryMiddleware);
        chain
    }

    fn signing_chain(key: &str) -> MiddlewareChain {
        let mut chain = stamping_chain();
        chain.add(SignedEnvelopeMiddleware::new(key).unwrap());
        chain
    }

    fn verifying_chain(key: &str) -> MiddlewareChain {
        let mut chain = MiddlewareChain::new();
        chain.add(SignatureVerificationMiddleware::new(key).unwrap());
        chain
    }

    /// Handler keeping the attributes of every command it sees.
    fn attribute_recorder() -> (InMemoryLocator, Arc<Mutex<Vec<Attributes>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = seen.clone();
        let handler = handler_fn(move |_: ChargeCard, attributes| {
            recorder.lock().push(attributes.clone());
            HandlerResult::Accept
        });
        (InMemoryLocator::new().with_instance(CHARGE_HANDLER, handler), seen)
    }

    fn dispatch_with(bus: &Bus<InMemoryTransport>, chain: MiddlewareChain, amounts: &[u64]) {
        let mut producer = Producer::new(bus).with_middleware(chain);
        for amount in amounts {
            producer.dispatch(&charge(*amount)).unwrap();
        }
    }

    // =============================================================================
    // PRODUCER CHAIN
    // =============================================================================

    #[test]
    fn test_chain_runs_in_order_and_halts_the_send() {
        init_test_logging();
        let bus = billing_bus(RequeuePolicy::default()).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));

        let mut chain = MiddlewareChain::new();
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        chain
            .add_fn(move |envelope, next| {
                a.borrow_mut().push("a");
                next.run(envelope);
            })
            .add_fn(move |_envelope, _next| {
                b.borrow_mut().push("b");
            })
            .add_fn(move |envelope, next| {
                c.borrow_mut().push("c");
                next.run(envelope);
            });

        dispatch_with(&bus, chain, &[5]);

        assert_eq!(*log.borrow(), vec!["a", "b"]);
        assert_eq!(bus.transport().pending(&charge_queue()).unwrap(), 0);
    }

    #[test]
    fn test_stamped_attributes_reach_the_handler() {
        let bus = billing_bus(RequeuePolicy::default()).unwrap();
        dispatch_with(&bus, stamping_chain(), &[5]);

        let received = bus.transport().recv(&charge_queue()).unwrap().unwrap();
        assert_eq!(received.delivery_mode(), DeliveryMode::Persistent);
        bus.transport().recover(&charge_queue());

        let (locator, seen) = attribute_recorder();
        Consumer::new(&bus, locator, HandleClassNameInflector)
            .consume(None, None)
            .unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message_id.len(), 2 * BusConfig::default().envelope_id_length);
        assert!(!seen[0].correlation_id.is_empty());
        assert!(seen[0].timestamp.is_some());
        assert_eq!(seen[0].message_type, "billing::ChargeCard");
    }

    // =============================================================================
    // SIGNATURES
    // =============================================================================

    #[test]
    fn test_signed_envelope_verifies_end_to_end() {
        let bus = billing_bus(RequeuePolicy::default()).unwrap();
        dispatch_with(&bus, signing_chain(SIGNING_KEY), &[5, 6]);

        let (locator, seen) = attribute_recorder();
        let stats = Consumer::new(&bus, locator, HandleClassNameInflector)
            .with_middleware(verifying_chain(SIGNING_KEY))
            .consume(None, None)
            .unwrap();

        assert_eq!(stats.accepted, 2);
        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert!(seen
            .iter()
            .all(|a| a.headers.contains_key(SIGNATURE_HEADER)));
    }

    #[test]
    fn test_foreign_signature_is_dropped_and_acknowledged() {
        let bus = billing_bus(RequeuePolicy::default()).unwrap();
        dispatch_with(&bus, signing_chain("some-other-key"), &[5]);

        let (locator, seen) = attribute_recorder();
        let stats = Consumer::new(&bus, locator, HandleClassNameInflector)
            .with_middleware(verifying_chain(SIGNING_KEY))
            .consume(None, None)
            .unwrap();

        // Short-circuit means accept; the handler never runs.
        assert_eq!(stats.accepted, 1);
        assert!(seen.lock().is_empty());
        assert_eq!(bus.transport().pending(&charge_queue()).unwrap(), 0);
        assert_eq!(bus.transport().in_flight(&charge_queue()), 0);
    }

    #[test]
    fn test_unsigned_envelope_is_dropped() {
        let bus = billing_bus(RequeuePolicy::default()).unwrap();
        dispatch_with(&bus, stamping_chain(), &[5]);

        let (locator, seen) = attribute_recorder();
        let stats = Consumer::new(&bus, locator, HandleClassNameInflector)
            .with_middleware(verifying_chain(SIGNING_KEY))
            .consume(None, None)
            .unwrap();

        assert_eq!(stats.accepted, 1);
        assert!(seen.lock().is_empty());
    }

    // =============================================================================
    // DUPLICATES
    // =============================================================================

    #[test]
    fn test_duplicate_message_id_is_handled_once() {
        let bus = billing_bus(RequeuePolicy::default()).unwrap();
        let mut chain = MiddlewareChain::new();
        chain.add_fn(|envelope, next| next.run(envelope.with_message_id("charge-5")));
        chain.add(EnvelopeIdMiddleware::default());
        dispatch_with(&bus, chain, &[5, 5]);
        assert_eq!(bus.transport().pending(&charge_queue()).unwrap(), 2);

        let mut consumer_chain = MiddlewareChain::new();
        consumer_chain.add(UniqueEnvelopeMiddleware::default());
        let (locator, seen) = attribute_recorder();
        let stats = Consumer::new(&bus, locator, HandleClassNameInflector)
            .with_middleware(consumer_chain)
            .consume(None, None)
            .unwrap();

        assert_eq!(stats.accepted, 2);
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message_id, "charge-5");
    }

    fn unique_chain() -> MiddlewareChain {
        let mut chain = MiddlewareChain::new();
        chain.add(UniqueEnvelopeMiddleware::default());
        chain
    }

    #[test]
    fn test_requeued_command_reaches_handler_again() {
        let bus = billing_bus(RequeuePolicy::default()).unwrap();
        let mut stamping = MiddlewareChain::new();
        stamping.add(EnvelopeIdMiddleware::default());
        dispatch_with(&bus, stamping, &[RETRY_AMOUNT]);

        let calls = Arc::new(Mutex::new(Vec::new()));
        let locator = InMemoryLocator::new().with_instance(CHARGE_HANDLER, charge_handler(calls.clone()));
        let stats = Consumer::new(&bus, locator, HandleClassNameInflector)
            .with_middleware(unique_chain())
            .consume(Some(CHARGE_ROUTE), Some(2))
            .unwrap();

        assert_eq!(stats.requeued, 2);
        assert_eq!(stats.accepted, 0);
        assert_eq!(calls.lock().len(), 2);
        assert_eq!(bus.transport().pending(&charge_queue()).unwrap(), 1);
    }
}
