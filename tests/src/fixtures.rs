//! # Test Fixtures
//!
//! A small billing domain shared by the integration flows and the benchmarks:
//! one routed command, one unrouted command and one event with two listeners.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use courier_bus::{
    handler_fn, listener_fn, naming, Bus, InMemoryTransport, Processor, ProcessorKind,
    RequeuePolicy, RouteTable, TypeCatalog,
};
use courier_telemetry::{init_logging, TelemetryConfig};
use courier_types::{BusResult, HandlerResult, Message, MessageKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// =============================================================================
// MESSAGES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeCard {
    pub card: String,
    pub amount: u64,
}

impl Message for ChargeCard {
    const TYPE_NAME: &'static str = "billing::ChargeCard";
    const KIND: MessageKind = MessageKind::Command;
}

/// Registered in the catalog but never routed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundCard {
    pub card: String,
    pub amount: u64,
}

impl Message for RefundCard {
    const TYPE_NAME: &'static str = "billing::RefundCard";
    const KIND: MessageKind = MessageKind::Command;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardCharged {
    pub card: String,
    pub amount: u64,
}

impl Message for CardCharged {
    const TYPE_NAME: &'static str = "billing::CardCharged";
    const KIND: MessageKind = MessageKind::Event;
}

// =============================================================================
// PROCESSORS
// =============================================================================

pub const CHARGE_HANDLER: &str = "billing::ChargeCardHandler";
pub const RECEIPT_MAILER: &str = "mail::ReceiptMailer";
pub const LEDGER: &str = "accounting::Ledger";

pub const CHARGE_ROUTE: &str = "charge";
pub const RECEIPT_ROUTE: &str = "receipts";
pub const LEDGER_ROUTE: &str = "ledger";

/// Amounts a [`charge_handler`] rejects permanently.
pub const DECLINED_AMOUNT: u64 = 0;
/// Amounts a [`charge_handler`] asks to see again.
pub const RETRY_AMOUNT: u64 = 1;

/// Handler mapping amounts to dispositions, recording every call.
pub fn charge_handler(calls: Arc<Mutex<Vec<ChargeCard>>>) -> Processor {
    handler_fn(move |command: ChargeCard, _| {
        let amount = command.amount;
        calls.lock().push(command);
        match amount {
            DECLINED_AMOUNT => HandlerResult::Reject,
            RETRY_AMOUNT => HandlerResult::Requeue,
            _ => HandlerResult::Accept,
        }
    })
}

/// Listener counting the events it sees.
pub fn counting_listener(count: Arc<AtomicUsize>) -> Processor {
    listener_fn(move |_: CardCharged, _| {
        count.fetch_add(1, Ordering::SeqCst);
    })
}

// =============================================================================
// BUS
// =============================================================================

pub fn billing_catalog() -> BusResult<TypeCatalog> {
    let mut catalog = TypeCatalog::new();
    catalog.register_message_type::<ChargeCard>()?;
    catalog.register_message_type::<RefundCard>()?;
    catalog.register_message_type::<CardCharged>()?;
    catalog.register_processor(CHARGE_HANDLER, ProcessorKind::Handler)?;
    catalog.register_processor(RECEIPT_MAILER, ProcessorKind::Listener)?;
    catalog.register_processor(LEDGER, ProcessorKind::Listener)?;
    Ok(catalog)
}

pub fn billing_routes() -> BusResult<RouteTable> {
    let mut router = RouteTable::new(billing_catalog()?);
    router.add_route(ChargeCard::TYPE_NAME, CHARGE_HANDLER, Some(CHARGE_ROUTE))?;
    router.add_route(CardCharged::TYPE_NAME, RECEIPT_MAILER, Some(RECEIPT_ROUTE))?;
    router.add_route(CardCharged::TYPE_NAME, LEDGER, Some(LEDGER_ROUTE))?;
    Ok(router)
}

/// Billing routes bound on a fresh in-memory transport.
pub fn billing_bus(policy: RequeuePolicy) -> BusResult<Bus<InMemoryTransport>> {
    let bus = Bus::new(billing_routes()?, InMemoryTransport::with_policy(policy));
    bus.bind_routes()?;
    Ok(bus)
}

pub fn charge_queue() -> String {
    naming::queue_name(CHARGE_HANDLER)
}

pub fn receipt_queue() -> String {
    naming::queue_name(RECEIPT_MAILER)
}

pub fn ledger_queue() -> String {
    naming::queue_name(LEDGER)
}

pub fn charge(amount: u64) -> ChargeCard {
    ChargeCard {
        card: format!("card-{amount}"),
        amount,
    }
}

/// Install the global subscriber once. Output only with `COURIER_TEST_LOGS` set.
pub fn init_test_logging() {
    let mut config = TelemetryConfig::for_service("courier-tests");
    config.console_output = std::env::var("COURIER_TEST_LOGS").is_ok();
    // Already initialized by an earlier test in this process.
    let _ = init_logging(&config);
}
