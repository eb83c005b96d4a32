//! # Courier Bus - Transport-Agnostic Command/Event Bus
//!
//! Applications send **commands** (routed to exactly one handler) and
//! **events** (fanned out to any number of listeners) without depending on
//! the queueing backend behind the [`Transport`] contract.
//!
//! ## Message Flow
//!
//! ```text
//! ┌──────────────┐   send_*()   ┌──────────────┐   recv()   ┌──────────────┐
//! │   Producer   │ ───────────► │  Transport   │ ─────────► │   Consumer   │
//! │ interceptors │              │ routing key  │            │ interceptors │
//! │ middleware   │              │  ─► queues   │ ◄───────── │ middleware   │
//! └──────────────┘              └──────────────┘ accept/    └──────┬───────┘
//!                                                reject            │
//!                                                        Locator ─► Handler
//!                                                                   Listener
//! ```
//!
//! ## Routing
//!
//! - Routes bind a message type to a processor type (see [`RouteTable`])
//! - Queue names and routing keys derive from type names (see [`naming`])
//! - A command must be routable before it is sent
//!
//! ## Delivery
//!
//! - Delivery tags identify in-flight envelopes; each is acknowledged once
//! - Requeued envelopes come back flagged as redelivered
//! - Envelopes over the redelivery cap are dead-lettered

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod bus;
pub mod catalog;
pub mod config;
pub mod consumer;
pub mod inflector;
pub mod interceptor;
pub mod locator;
pub mod middleware;
pub mod naming;
pub mod processor;
pub mod producer;
pub mod registration;
pub mod router;
pub mod serializer;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

// Re-export main types
pub use bus::Bus;
pub use catalog::{TypeCatalog, TypeEntry};
pub use config::BusConfig;
pub use consumer::{Consumer, StopHandle};
pub use inflector::{ClassNameInflector, HandleClassNameInflector, Inflector};
pub use interceptor::{ConsumerInterceptor, ProducerInterceptor};
pub use locator::{FactoryLocator, InMemoryLocator, Locator};
pub use middleware::{Middleware, MiddlewareChain, Next};
pub use processor::{handler_fn, listener_fn, Handler, Listener, Processor, ProcessorKind};
pub use producer::{BufferedProducer, Produce, Producer};
pub use registration::{ArrayProvider, Provider, Resolver, StaticResolver, Subject};
pub use router::{Route, RouteTable};
pub use serializer::{JsonSerializer, Serializer};
pub use transport::{
    ConsumeStats, InMemoryTransport, RequeuePolicy, RequeuePosition, Transport, TransportResult,
};

/// Messages per kind a buffered producer holds before flushing.
pub const DEFAULT_BUFFER_SIZE: usize = 10;

/// Random bytes behind a generated envelope id.
pub const DEFAULT_ENVELOPE_ID_LENGTH: usize = 10;
