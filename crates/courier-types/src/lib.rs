//! # Courier Types Crate
//!
//! This crate contains the envelope, the message model and the error taxonomy
//! shared by every Courier crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Immutable Envelopes**: An `Envelope` is only ever changed by producing a
//!   new value; nothing mutates an envelope already handed to a transport.
//! - **Explicit Control Signals**: `HandlerResult` and `InterceptorResult` are
//!   plain values returned by each stage, never errors.

pub mod envelope;
pub mod errors;
pub mod message;

pub use envelope::{Attributes, DeliveryMode, DeliveryTag, Envelope, Headers, Priority};
pub use errors::{BusError, BusResult, TransportError};
pub use message::{
    HandlerResult, InboundMessage, InterceptorResult, Message, MessageKind, OutboundMessage,
};
