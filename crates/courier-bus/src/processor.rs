//! # Processors
//!
//! Fixed-shape processor interfaces. A command is handled by exactly one
//! [`Handler`]; an event is observed by any number of [`Listener`]s, each
//! behind its own route and queue.
//!
//! Typed adapters ([`handler_fn`], [`listener_fn`]) decode the payload into the
//! concrete message type before invoking a closure.

use courier_types::{Attributes, BusResult, HandlerResult, InboundMessage, Message};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Which processor interface a processor type implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessorKind {
    Handler,
    Listener,
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Handler => write!(f, "handler"),
            Self::Listener => write!(f, "listener"),
        }
    }
}

/// Handles commands.
pub trait Handler: Send + Sync {
    /// Process a command and decide its disposition.
    ///
    /// An `Err` propagates out of the consume loop and leaves the delivery
    /// un-acknowledged.
    fn handle(&self, command: &InboundMessage) -> BusResult<HandlerResult>;
}

/// Listens to events.
pub trait Listener: Send + Sync {
    /// Observe an event. Events are always accepted afterwards.
    fn on(&self, event: &InboundMessage) -> BusResult<()>;
}

/// A located processor instance.
#[derive(Clone)]
pub enum Processor {
    Handler(Arc<dyn Handler>),
    Listener(Arc<dyn Listener>),
}

impl Processor {
    #[must_use]
    pub fn handler(handler: impl Handler + 'static) -> Self {
        Self::Handler(Arc::new(handler))
    }

    #[must_use]
    pub fn listener(listener: impl Listener + 'static) -> Self {
        Self::Listener(Arc::new(listener))
    }

    #[must_use]
    pub fn kind(&self) -> ProcessorKind {
        match self {
            Self::Handler(_) => ProcessorKind::Handler,
            Self::Listener(_) => ProcessorKind::Listener,
        }
    }
}

impl fmt::Debug for Processor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Processor::{}", self.kind())
    }
}

struct FnHandler<C, F> {
    f: F,
    _command: PhantomData<fn(C)>,
}

impl<C, F> Handler for FnHandler<C, F>
where
    C: Message,
    F: Fn(C, &Attributes) -> HandlerResult + Send + Sync,
{
    fn handle(&self, command: &InboundMessage) -> BusResult<HandlerResult> {
        let decoded = command.decode::<C>()?;
        Ok((self.f)(decoded, &command.attributes))
    }
}

struct FnListener<E, F> {
    f: F,
    _event: PhantomData<fn(E)>,
}

impl<E, F> Listener for FnListener<E, F>
where
    E: Message,
    F: Fn(E, &Attributes) + Send + Sync,
{
    fn on(&self, event: &InboundMessage) -> BusResult<()> {
        let decoded = event.decode::<E>()?;
        (self.f)(decoded, &event.attributes);
        Ok(())
    }
}

/// Wrap a closure taking the decoded command as a handler.
pub fn handler_fn<C, F>(f: F) -> Processor
where
    C: Message,
    F: Fn(C, &Attributes) -> HandlerResult + Send + Sync + 'static,
{
    Processor::handler(FnHandler {
        f,
        _command: PhantomData,
    })
}

/// Wrap a closure taking the decoded event as a listener.
pub fn listener_fn<E, F>(f: F) -> Processor
where
    E: Message,
    F: Fn(E, &Attributes) + Send + Sync + 'static,
{
    Processor::listener(FnListener {
        f,
        _event: PhantomData,
    })
}
