//! # Producers
//!
//! Turn commands and events into envelopes and hand them to the transport.
//!
//! ```text
//! before_*_serialize ─► serialize ─► after_*_serialize ─► middleware
//!     ─► before_send_* ─► transport.send(routing key) ─► after_send_*
//! ```
//!
//! A Skip or Stop from any interceptor hook, or a middleware that never
//! calls `next`, silently drops the send. Commands must be routable before
//! anything else happens.

use crate::bus::Bus;
use crate::config::BusConfig;
use crate::interceptor::ProducerInterceptor;
use crate::middleware::MiddlewareChain;
use crate::naming::routing_key;
use crate::serializer::{JsonSerializer, Serializer};
use crate::transport::Transport;
use courier_types::{
    BusError, BusResult, Envelope, InterceptorResult, Message, MessageKind, OutboundMessage,
};
use std::collections::VecDeque;
use tracing::{debug, error, warn};

/// Sending side shared by [`Producer`] and [`BufferedProducer`].
pub trait Produce {
    /// # Errors
    ///
    /// `BusError::MessageType` when the message is not an event, plus
    /// serialization and transport failures.
    fn send_event(&mut self, event: OutboundMessage) -> BusResult<()>;

    /// # Errors
    ///
    /// `BusError::Unroutable` when no handler is registered for the command,
    /// `BusError::MessageType` when the message is not a command, plus
    /// serialization and transport failures.
    fn send_command(&mut self, command: OutboundMessage) -> BusResult<()>;

    /// Send a typed event.
    ///
    /// # Errors
    ///
    /// See [`Produce::send_event`].
    fn publish<E: Message>(&mut self, event: &E) -> BusResult<()>
    where
        Self: Sized,
    {
        self.send_event(OutboundMessage::from_message(event)?)
    }

    /// Send a typed command.
    ///
    /// # Errors
    ///
    /// See [`Produce::send_command`].
    fn dispatch<C: Message>(&mut self, command: &C) -> BusResult<()>
    where
        Self: Sized,
    {
        self.send_command(OutboundMessage::from_message(command)?)
    }
}

fn expect_kind(message: &OutboundMessage, kind: MessageKind) -> BusResult<()> {
    if message.kind == kind {
        Ok(())
    } else {
        Err(BusError::MessageType {
            type_name: message.message_type.clone(),
        })
    }
}

pub struct Producer<'bus, T: Transport> {
    bus: &'bus Bus<T>,
    serializer: Box<dyn Serializer>,
    middleware: MiddlewareChain,
    interceptor: Option<Box<dyn ProducerInterceptor>>,
}

impl<'bus, T: Transport> Producer<'bus, T> {
    /// Producer encoding bodies as JSON.
    #[must_use]
    pub fn new(bus: &'bus Bus<T>) -> Self {
        Self::with_serializer(bus, JsonSerializer)
    }

    #[must_use]
    pub fn with_serializer(bus: &'bus Bus<T>, serializer: impl Serializer + 'static) -> Self {
        Self {
            bus,
            serializer: Box::new(serializer),
            middleware: MiddlewareChain::new(),
            interceptor: None,
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

    pub fn set_interceptor(&mut self, interceptor: impl ProducerInterceptor + 'static) -> &mut Self {
        self.interceptor = Some(Box::new(interceptor));
        self
    }

    #[must_use]
    pub fn bus(&self) -> &'bus Bus<T> {
        self.bus
    }

    fn hook(&self, f: impl FnOnce(&dyn ProducerInterceptor) -> InterceptorResult) -> bool {
        self.interceptor
            .as_deref()
            .map_or(true, |interceptor| f(interceptor).is_pass())
    }

    fn send(&self, mut message: OutboundMessage) -> BusResult<()> {
        let kind = message.kind;
        if kind == MessageKind::Command && !self.bus.router().is_routable(&message.message_type) {
            return Err(BusError::Unroutable {
                message_type: message.message_type,
            });
        }

        let pass = self.hook(|i| match kind {
            MessageKind::Event => i.before_event_serialize(&mut message),
            MessageKind::Command => i.before_command_serialize(&mut message),
        });
        if !pass {
            debug!(message_type = %message.message_type, "Send dropped before serialization");
            return Ok(());
        }

        let key = routing_key(&message.message_type);
        let mut envelope = Envelope::new(self.serializer.serialize(&message.payload)?)
            .with_content_type(self.serializer.content_type())
            .with_content_encoding(self.serializer.content_encoding())
            .with_message_type(message.message_type.as_str())
            .with_routing_key(key.as_str());

        let pass = self.hook(|i| match kind {
            MessageKind::Event => i.after_event_serialize(&message, &mut envelope),
            MessageKind::Command => i.after_command_serialize(&message, &mut envelope),
        });
        if !pass {
            debug!(message_type = %message.message_type, "Send dropped after serialization");
            return Ok(());
        }

        let Some(mut envelope) = self.middleware.run(envelope) else {
            debug!(message_type = %message.message_type, "Send short-circuited by middleware");
            return Ok(());
        };

        let pass = self.hook(|i| match kind {
            MessageKind::Event => i.before_send_event(&mut envelope),
            MessageKind::Command => i.before_send_command(&mut envelope),
        });
        if !pass {
            debug!(message_type = %message.message_type, "Send dropped before transport");
            return Ok(());
        }

        self.bus.transport().send(&key, envelope.clone())?;
        debug!(
            kind = %kind,
            message_type = %message.message_type,
            message_id = envelope.message_id(),
            routing_key = %key,
            "Message sent"
        );

        if let Some(interceptor) = self.interceptor.as_deref() {
            match kind {
                MessageKind::Event => interceptor.after_send_event(&envelope),
                MessageKind::Command => interceptor.after_send_command(&envelope),
            }
        }
        Ok(())
    }
}

impl<T: Transport> Produce for Producer<'_, T> {
    fn send_event(&mut self, event: OutboundMessage) -> BusResult<()> {
        expect_kind(&event, MessageKind::Event)?;
        self.send(event)
    }

    fn send_command(&mut self, command: OutboundMessage) -> BusResult<()> {
        expect_kind(&command, MessageKind::Command)?;
        self.send(command)
    }
}

/// Holds messages back and sends them in batches.
///
/// Events and commands are buffered apart; a buffer that reaches
/// `buffer_size` is flushed in FIFO order. Whatever is still buffered goes
/// out on [`BufferedProducer::close`] or, failing that, on drop.
///
/// A transport error stops the flush of that buffer and keeps the failing
/// message and everything behind it. Any other failure (unroutable command,
/// serialization) would repeat, so that message is dropped with a warning and
/// the flush carries on. The command buffer is flushed even when the event
/// buffer failed.
pub struct BufferedProducer<P: Produce> {
    inner: P,
    buffer_size: usize,
    events: VecDeque<OutboundMessage>,
    commands: VecDeque<OutboundMessage>,
}

impl<P: Produce> BufferedProducer<P> {
    #[must_use]
    pub fn new(inner: P) -> Self {
        Self::with_buffer_size(inner, crate::DEFAULT_BUFFER_SIZE)
    }

    /// `buffer_size` is raised to 1.
    #[must_use]
    pub fn with_buffer_size(inner: P, buffer_size: usize) -> Self {
        Self {
            inner,
            buffer_size: buffer_size.max(1),
            events: VecDeque::new(),
            commands: VecDeque::new(),
        }
    }

    #[must_use]
    pub fn with_config(inner: P, config: &BusConfig) -> Self {
        Self::with_buffer_size(inner, config.buffer_size)
    }

    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    #[must_use]
    pub fn buffered_events(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn buffered_commands(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Send everything buffered, events first.
    ///
    /// # Errors
    ///
    /// The first send failure. Only messages refused by the transport stay
    /// buffered.
    pub fn flush(&mut self) -> BusResult<()> {
        let events = flush_queue(&mut self.events, |m| self.inner.send_event(m));
        let commands = flush_queue(&mut self.commands, |m| self.inner.send_command(m));
        events.and(commands)
    }

    /// Flush and release the producer.
    ///
    /// # Errors
    ///
    /// The first send failure. Messages the transport refused are retried
    /// once more on drop.
    pub fn close(mut self) -> BusResult<()> {
        self.flush()
    }
}

/// Drain `queue` in order, returning the first error seen.
fn flush_queue(
    queue: &mut VecDeque<OutboundMessage>,
    mut send: impl FnMut(OutboundMessage) -> BusResult<()>,
) -> BusResult<()> {
    let mut first_error = None;
    while let Some(message) = queue.pop_front() {
        let retry = message.clone();
        let Err(err) = send(message) else {
            continue;
        };
        if matches!(err, BusError::Transport(_)) {
            queue.push_front(retry);
            return Err(first_error.unwrap_or(err));
        }
        warn!(
            message_type = %retry.message_type,
            error = %err,
            "Dropping message that cannot be sent"
        );
        first_error.get_or_insert(err);
    }
    first_error.map_or(Ok(()), Err)
}

impl<P: Produce> Produce for BufferedProducer<P> {
    fn send_event(&mut self, event: OutboundMessage) -> BusResult<()> {
        expect_kind(&event, MessageKind::Event)?;
        self.events.push_back(event);
        if self.events.len() < self.buffer_size {
            return Ok(());
        }
        flush_queue(&mut self.events, |m| self.inner.send_event(m))
    }

    fn send_command(&mut self, command: OutboundMessage) -> BusResult<()> {
        expect_kind(&command, MessageKind::Command)?;
        self.commands.push_back(command);
        if self.commands.len() < self.buffer_size {
            return Ok(());
        }
        flush_queue(&mut self.commands, |m| self.inner.send_command(m))
    }
}

impl<P: Produce> Drop for BufferedProducer<P> {
    fn drop(&mut self) {
        if self.events.is_empty() && self.commands.is_empty() {
            return;
        }
        if let Err(err) = self.flush() {
            error!(
                error = %err,
                events = self.events.len(),
                commands = self.commands.len(),
                "Failed to flush buffered messages"
            );
        }
    }
}
