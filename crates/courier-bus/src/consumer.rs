//! # Consumer
//!
//! Pull loop turning received envelopes into processor calls and processor
//! outcomes into transport acknowledgements.
//!
//! ## Per-delivery state machine
//!
//! ```text
//! Received ─► PreFiltered ─► Deserialized ─► Dispatched ─► Acknowledged
//!    │             │               │              │
//!    └─────────────┴── Skip/Stop ──┴──────────────┴──► accept
//! ```
//!
//! - Every received delivery is acknowledged exactly once, from the envelope
//!   as it was received.
//! - A Skip accepts the delivery and moves on; a Stop does the same and then
//!   halts the loop.
//! - Decoding, routing and resolution errors propagate and leave the
//!   delivery unacknowledged.
//! - Events are always accepted; commands map their [`HandlerResult`].

use crate::bus::Bus;
use crate::catalog::TypeEntry;
use crate::inflector::Inflector;
use crate::interceptor::ConsumerInterceptor;
use crate::locator::Locator;
use crate::middleware::MiddlewareChain;
use crate::processor::Processor;
use crate::serializer::{JsonSerializer, Serializer};
use crate::transport::{ConsumeStats, Transport};
use courier_types::{
    BusError, BusResult, Envelope, HandlerResult, InboundMessage, InterceptorResult, MessageKind,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cooperative stop flag, checked between deliveries.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// How a delivery ends and whether the loop halts afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Disposition {
    result: HandlerResult,
    halt: bool,
}

impl Disposition {
    const ACCEPT: Self = Self {
        result: HandlerResult::Accept,
        halt: false,
    };

    const HALT: Self = Self {
        result: HandlerResult::Accept,
        halt: true,
    };
}

/// Early return on a Skip or Stop signal.
macro_rules! gate {
    ($signal:expr) => {
        match $signal {
            InterceptorResult::Pass => {}
            InterceptorResult::Skip => return Ok(Disposition::ACCEPT),
            InterceptorResult::Stop => return Ok(Disposition::HALT),
        }
    };
}

pub struct Consumer<'bus, T: Transport> {
    bus: &'bus Bus<T>,
    locator: Box<dyn Locator>,
    inflector: Box<dyn Inflector>,
    serializer: Box<dyn Serializer>,
    middleware: MiddlewareChain,
    interceptor: Option<Box<dyn ConsumerInterceptor>>,
    stop: StopHandle,
}

impl<'bus, T: Transport> Consumer<'bus, T> {
    /// Consumer decoding JSON bodies.
    #[must_use]
    pub fn new(
        bus: &'bus Bus<T>,
        locator: impl Locator + 'static,
        inflector: impl Inflector + 'static,
    ) -> Self {
        Self::with_serializer(bus, locator, inflector, JsonSerializer)
    }

    #[must_use]
    pub fn with_serializer(
        bus: &'bus Bus<T>,
        locator: impl Locator + 'static,
        inflector: impl Inflector + 'static,
        serializer: impl Serializer + 'static,
    ) -> Self {
        Self {
            bus,
            locator: Box::new(locator),
            inflector: Box::new(inflector),
            serializer: Box::new(serializer),
            middleware: MiddlewareChain::new(),
            interceptor: None,
            stop: StopHandle::default(),
        }
    }

    #[must_use]
    pub fn with_middleware(mut self, middleware: MiddlewareChain) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn middleware_mut(&mut self) -> &mut MiddlewareChain {
        &mut self.middleware
    }

    pub fn set_interceptor(&mut self, interceptor: impl ConsumerInterceptor + 'static) -> &mut Self {
        self.interceptor = Some(Box::new(interceptor));
        self
    }

    /// Handle that halts a running consume loop at the next iteration
    /// boundary. Usable from any thread.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    #[must_use]
    pub fn should_stop(&self) -> bool {
        self.stop.is_stopped()
    }

    /// Consume the named route's queue, or every route's queue when `None`.
    /// Stops after `limit` deliveries, on a stop request, or when no queue
    /// has anything left.
    ///
    /// # Errors
    ///
    /// `BusError::RouteNotFound` for an unknown route name, plus every error
    /// raised while processing a delivery.
    pub fn consume(&self, route_name: Option<&str>, limit: Option<usize>) -> BusResult<ConsumeStats> {
        let router = self.bus.router();
        let queues: Vec<String> = match route_name {
            Some(name) => vec![router.find_route_by_name(name)?.queue_name().to_string()],
            None => router.queue_names().into_iter().map(str::to_string).collect(),
        };
        self.consume_queues(&queues, limit)
    }

    /// Consume the given queues in round-robin order.
    ///
    /// # Errors
    ///
    /// See [`Consumer::consume`].
    pub fn consume_queues<S: AsRef<str>>(&self, queues: &[S], limit: Option<usize>) -> BusResult<ConsumeStats> {
        let queues: Vec<String> = queues.iter().map(|q| q.as_ref().to_string()).collect();
        self.stop.reset();

        if let Some(interceptor) = self.interceptor.as_deref() {
            interceptor.before_consume(&queues);
        }

        let mut stats = ConsumeStats::default();
        self.run(&queues, limit, &mut stats)?;

        info!(
            queues = queues.len(),
            accepted = stats.accepted,
            rejected = stats.rejected,
            requeued = stats.requeued,
            consumed = stats.consumed,
            "Consume finished"
        );
        if let Some(interceptor) = self.interceptor.as_deref() {
            interceptor.after_consume(&queues, stats.consumed);
        }
        Ok(stats)
    }

    fn run(&self, queues: &[String], limit: Option<usize>, stats: &mut ConsumeStats) -> BusResult<()> {
        let transport = self.bus.transport();
        loop {
            let mut received_any = false;
            for queue in queues {
                if self.stop.is_stopped() || limit.is_some_and(|limit| stats.consumed >= limit) {
                    return Ok(());
                }
                if transport.pending(queue)? == 0 {
                    continue;
                }

                let mut target = queue.clone();
                match self.signal(|i| i.before_receive(&mut target)) {
                    InterceptorResult::Pass => {}
                    InterceptorResult::Skip => continue,
                    InterceptorResult::Stop => {
                        self.stop.stop();
                        return Ok(());
                    }
                }

                let Some(received) = transport.recv(&target)? else {
                    continue;
                };
                received_any = true;

                let disposition = self.process(&received, &target)?;
                match disposition.result {
                    HandlerResult::Accept => transport.accept(&received)?,
                    HandlerResult::Reject => transport.reject(&received, false)?,
                    HandlerResult::Requeue => transport.reject(&received, true)?,
                }
                stats.record(disposition.result);

                if disposition.halt {
                    debug!(queue = %target, "Consume loop halted by interceptor");
                    self.stop.stop();
                }
            }

            if !received_any {
                return Ok(());
            }
        }
    }

    fn signal(
        &self,
        f: impl FnOnce(&dyn ConsumerInterceptor) -> InterceptorResult,
    ) -> InterceptorResult {
        self.interceptor
            .as_deref()
            .map_or(InterceptorResult::Pass, f)
    }

    fn process(&self, received: &Envelope, queue: &str) -> BusResult<Disposition> {
        let mut envelope = received.clone();
        gate!(self.signal(|i| i.after_receive(&mut envelope, queue)));

        let Some(mut envelope) = self.middleware.run(envelope) else {
            warn!(
                queue,
                message_id = received.message_id(),
                "Delivery short-circuited by middleware, accepting"
            );
            return Ok(Disposition::ACCEPT);
        };

        gate!(self.signal(|i| i.before_unserialize(&mut envelope)));
        let mut message = self.unserialize(&envelope)?;
        gate!(self.signal(|i| i.after_unserialize(&envelope, &mut message)));

        debug!(
            queue,
            kind = %message.kind,
            message_type = %message.message_type,
            message_id = envelope.message_id(),
            "Message received"
        );

        match message.kind {
            MessageKind::Event => self.dispatch_event(queue, message),
            MessageKind::Command => self.dispatch_command(queue, message),
        }
    }

    fn unserialize(&self, envelope: &Envelope) -> BusResult<InboundMessage> {
        if envelope.content_encoding() != self.serializer.content_encoding() {
            return Err(BusError::Deserialization(format!(
                "cannot decode content encoding \"{}\", expected \"{}\"",
                envelope.content_encoding(),
                self.serializer.content_encoding()
            )));
        }
        if envelope.content_type() != self.serializer.content_type() {
            return Err(BusError::Deserialization(format!(
                "cannot unserialize content type \"{}\", expected \"{}\"",
                envelope.content_type(),
                self.serializer.content_type()
            )));
        }

        let payload = self.serializer.unserialize(envelope.body())?;
        let message_type = envelope.message_type();
        let kind = match self.bus.router().catalog().lookup(message_type) {
            Some(TypeEntry::Message(kind)) => kind,
            Some(TypeEntry::Processor(_)) => {
                return Err(BusError::MessageType {
                    type_name: message_type.to_string(),
                })
            }
            None => {
                return Err(BusError::Deserialization(format!(
                    "unknown message type \"{message_type}\""
                )))
            }
        };

        Ok(InboundMessage::new(message_type, kind, payload, envelope.attributes()))
    }

    fn dispatch_event(&self, queue: &str, mut event: InboundMessage) -> BusResult<Disposition> {
        let route = self.bus.router().find_route(queue, &event.message_type)?;
        let Some(processor) = self.locator.instance_for(route.processor_type()) else {
            debug!(
                message_type = %event.message_type,
                listener = route.processor_type(),
                "No listener instance, accepting"
            );
            return Ok(Disposition::ACCEPT);
        };

        let method = self.inflector.resolve(&event, &processor);
        let Processor::Listener(listener) = &processor else {
            return Err(BusError::ProcessorResolution(format!(
                "\"{}\" cannot listen to event \"{}\" (method \"{method}\")",
                route.processor_type(),
                event.message_type
            )));
        };

        gate!(self.signal(|i| i.before_listener(&mut event, &processor, &method)));
        listener.on(&event)?;
        debug!(
            message_type = %event.message_type,
            listener = route.processor_type(),
            method = %method,
            "Event processed"
        );
        gate!(self.signal(|i| i.after_listener(&event, &processor, &method)));

        Ok(Disposition::ACCEPT)
    }

    fn dispatch_command(&self, queue: &str, mut command: InboundMessage) -> BusResult<Disposition> {
        let route = self.bus.router().find_route(queue, &command.message_type)?;
        let processor = self.locator.instance_for(route.processor_type()).ok_or_else(|| {
            BusError::ProcessorResolution(format!(
                "could not locate an instance of \"{}\"",
                route.processor_type()
            ))
        })?;

        let method = self.inflector.resolve(&command, &processor);
        let Processor::Handler(handler) = &processor else {
            return Err(BusError::ProcessorResolution(format!(
                "\"{}\" cannot handle command \"{}\" (method \"{method}\")",
                route.processor_type(),
                command.message_type
            )));
        };

        gate!(self.signal(|i| i.before_handler(&mut command, &processor, &method)));
        let result = handler.handle(&command)?;
        debug!(
            message_type = %command.message_type,
            handler = route.processor_type(),
            method = %method,
            result = ?result,
            "Command processed"
        );

        let halt = self.signal(|i| i.after_handler(&command, &processor, &method, result))
            == InterceptorResult::Stop;
        Ok(Disposition { result, halt })
    }
}
