//! # Interceptors
//!
//! Named hooks around each producer and consumer stage. Every hook defaults
//! to [`InterceptorResult::Pass`]; implementors override only what they need.
//! Hooks influence the pipeline by mutating what they are handed and through
//! the signal they return.
//!
//! ```text
//! Producer:  before_*_serialize ─► after_*_serialize ─► middleware
//!            ─► before_send_* ─► transport.send ─► after_send_*
//!
//! Consumer:  before_consume ─► [ before_receive ─► recv ─► after_receive
//!            ─► middleware ─► before_unserialize ─► after_unserialize
//!            ─► before_handler/listener ─► invoke ─► after_handler/listener ]*
//!            ─► after_consume
//! ```

use crate::processor::Processor;
use courier_types::{Envelope, HandlerResult, InboundMessage, InterceptorResult, OutboundMessage};

pub trait ProducerInterceptor {
    fn before_event_serialize(&self, _event: &mut OutboundMessage) -> InterceptorResult {
        InterceptorResult::Pass
    }

    fn after_event_serialize(
        &self,
        _event: &OutboundMessage,
        _envelope: &mut Envelope,
    ) -> InterceptorResult {
        InterceptorResult::Pass
    }

    fn before_send_event(&self, _envelope: &mut Envelope) -> InterceptorResult {
        InterceptorResult::Pass
    }

    fn after_send_event(&self, _envelope: &Envelope) {}

    fn before_command_serialize(&self, _command: &mut OutboundMessage) -> InterceptorResult {
        InterceptorResult::Pass
    }

    fn after_command_serialize(
        &self,
        _command: &OutboundMessage,
        _envelope: &mut Envelope,
    ) -> InterceptorResult {
        InterceptorResult::Pass
    }

    fn before_send_command(&self, _envelope: &mut Envelope) -> InterceptorResult {
        InterceptorResult::Pass
    }

    fn after_send_command(&self, _envelope: &Envelope) {}
}

pub trait ConsumerInterceptor {
    fn before_consume(&self, _queues: &[String]) {}

    fn after_consume(&self, _queues: &[String], _consumed: usize) {}

    /// May rewrite the queue about to be polled.
    fn before_receive(&self, _queue: &mut String) -> InterceptorResult {
        InterceptorResult::Pass
    }

    fn after_receive(&self, _envelope: &mut Envelope, _queue: &str) -> InterceptorResult {
        InterceptorResult::Pass
    }

    fn before_unserialize(&self, _envelope: &mut Envelope) -> InterceptorResult {
        InterceptorResult::Pass
    }

    fn after_unserialize(
        &self,
        _envelope: &Envelope,
        _message: &mut InboundMessage,
    ) -> InterceptorResult {
        InterceptorResult::Pass
    }

    fn before_handler(
        &self,
        _command: &mut InboundMessage,
        _handler: &Processor,
        _method: &str,
    ) -> InterceptorResult {
        InterceptorResult::Pass
    }

    /// The handler already decided; a Skip or Stop here keeps its result.
    fn after_handler(
        &self,
        _command: &InboundMessage,
        _handler: &Processor,
        _method: &str,
        _result: HandlerResult,
    ) -> InterceptorResult {
        InterceptorResult::Pass
    }

    fn before_listener(
        &self,
        _event: &mut InboundMessage,
        _listener: &Processor,
        _method: &str,
    ) -> InterceptorResult {
        InterceptorResult::Pass
    }

    fn after_listener(
        &self,
        _event: &InboundMessage,
        _listener: &Processor,
        _method: &str,
    ) -> InterceptorResult {
        InterceptorResult::Pass
    }
}
