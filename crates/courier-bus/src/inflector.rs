//! # Inflectors
//!
//! Name the processor method a message is dispatched to. Dispatch itself goes
//! through the fixed [`Handler`](crate::processor::Handler) /
//! [`Listener`](crate::processor::Listener) interfaces; the inflected name is
//! what interceptors and logs see.

use crate::naming::{lower_first, short_name, upper_first};
use crate::processor::Processor;
use courier_types::InboundMessage;

pub trait Inflector {
    fn resolve(&self, message: &InboundMessage, processor: &Processor) -> String;
}

/// `billing::ChargeCard` -> `chargeCard`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassNameInflector;

impl Inflector for ClassNameInflector {
    fn resolve(&self, message: &InboundMessage, _processor: &Processor) -> String {
        lower_first(short_name(&message.message_type))
    }
}

/// `billing::ChargeCard` -> `handleChargeCard`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HandleClassNameInflector;

impl Inflector for HandleClassNameInflector {
    fn resolve(&self, message: &InboundMessage, processor: &Processor) -> String {
        format!(
            "handle{}",
            upper_first(&ClassNameInflector.resolve(message, processor))
        )
    }
}
