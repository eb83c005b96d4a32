//! # Registration Flow
//!
//! Routes declared through a provider and a resolver instead of by hand, then
//! exercised by a producer and a consumer.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use courier_bus::{
        naming, ArrayProvider, Bus, Consumer, FactoryLocator, HandleClassNameInflector,
        InMemoryTransport, Produce, Producer, RouteTable, StaticResolver, Transport, TypeCatalog,
    };
    use courier_types::{BusError, Message};
    use parking_lot::Mutex;

    use crate::fixtures::*;

    fn resolver() -> StaticResolver {
        let mut resolver = StaticResolver::new();
        resolver
            .add_handler(CHARGE_HANDLER, ChargeCard::TYPE_NAME)
            .add_listener(RECEIPT_MAILER, CardCharged::TYPE_NAME)
            .add_listener(LEDGER, CardCharged::TYPE_NAME);
        resolver
    }

    fn populated_router() -> RouteTable {
        let provider = ArrayProvider::new([CHARGE_HANDLER, RECEIPT_MAILER, LEDGER]).unwrap();
        let mut router = RouteTable::new(TypeCatalog::new());
        assert_eq!(router.populate(&provider, &resolver()).unwrap(), 3);
        router
    }

    #[test]
    fn test_populated_routes_follow_naming_rules() {
        init_test_logging();
        let router = populated_router();

        let route = router.find_route_by_processor_type(CHARGE_HANDLER).unwrap();
        assert_eq!(route.queue_name(), "courier.queue:billing.chargeCardHandler");
        assert_eq!(route.routing_key(), "courier.message:billing.chargeCard");
        assert_eq!(route.name().len(), 10);

        assert!(router.is_routable(ChargeCard::TYPE_NAME));
        assert!(router.is_routable(CardCharged::TYPE_NAME));
        assert!(!router.is_routable(RefundCard::TYPE_NAME));
        assert_eq!(router.routes_for_message(CardCharged::TYPE_NAME).count(), 2);
        assert_eq!(
            router.queue_names(),
            vec![
                naming::queue_name(CHARGE_HANDLER),
                naming::queue_name(RECEIPT_MAILER),
                naming::queue_name(LEDGER),
            ]
        );
    }

    #[test]
    fn test_populated_bus_carries_commands_and_events() {
        let bus = Bus::new(populated_router(), InMemoryTransport::new());
        assert_eq!(bus.bind_routes().unwrap(), 3);

        let mut producer = Producer::new(&bus);
        producer.dispatch(&charge(5)).unwrap();
        producer
            .publish(&CardCharged {
                card: "card-5".into(),
                amount: 5,
            })
            .unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let events = Arc::new(AtomicUsize::new(0));
        let mut locator = FactoryLocator::new();
        let handler_calls = calls.clone();
        locator.add_factory(CHARGE_HANDLER, move || charge_handler(handler_calls.clone()));
        let mailer_events = events.clone();
        locator.add_factory(RECEIPT_MAILER, move || counting_listener(mailer_events.clone()));

        let stats = Consumer::new(&bus, locator, HandleClassNameInflector)
            .consume(None, None)
            .unwrap();

        // Ledger has no instance: its event is still accepted.
        assert_eq!(stats.accepted, 3);
        assert_eq!(calls.lock().len(), 1);
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_handler_for_a_command_is_rejected() {
        let mut router = populated_router();
        router
            .catalog_mut()
            .register_processor("billing::BackupChargeHandler", courier_bus::ProcessorKind::Handler)
            .unwrap();

        let err = router
            .add_route(ChargeCard::TYPE_NAME, "billing::BackupChargeHandler", None)
            .unwrap_err();

        assert!(matches!(err, BusError::Configuration(_)));
        let route = router.find_route_by_message_type(ChargeCard::TYPE_NAME).unwrap();
        assert_eq!(route.processor_type(), CHARGE_HANDLER);
    }

    #[test]
    fn test_resolver_kind_mismatch_is_rejected() {
        let provider = ArrayProvider::new([CHARGE_HANDLER]).unwrap();
        let mut resolver = StaticResolver::new();
        resolver
            .add_handler(CHARGE_HANDLER, ChargeCard::TYPE_NAME)
            .add_listener(CHARGE_HANDLER, CardCharged::TYPE_NAME);

        let err = RouteTable::new(TypeCatalog::new())
            .populate(&provider, &resolver)
            .unwrap_err();
        assert!(matches!(err, BusError::Configuration(_)));
    }

    #[test]
    fn test_unbind_routes_keeps_queued_messages() {
        let bus = Bus::new(populated_router(), InMemoryTransport::new());
        bus.bind_routes().unwrap();
        Producer::new(&bus).dispatch(&charge(5)).unwrap();

        assert_eq!(bus.unbind_routes().unwrap(), 3);
        assert_eq!(bus.transport().pending(&charge_queue()).unwrap(), 1);
        assert!(bus.transport().bound_queues(&naming::routing_key(ChargeCard::TYPE_NAME)).is_empty());
    }
}
