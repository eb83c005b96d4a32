//! # Message Model
//!
//! Commands and events, their wire-neutral payload form, and the control
//! signals threaded through the producer and consumer pipelines.

use crate::envelope::Attributes;
use crate::errors::{BusError, BusResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Whether a message is a command or an event. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Routed to exactly one handler, answered with a [`HandlerResult`].
    Command,
    /// Fanned out to zero or more listeners, no outcome feedback.
    Event,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => write!(f, "command"),
            Self::Event => write!(f, "event"),
        }
    }
}

/// An application message.
///
/// `TYPE_NAME` is a path-like name (`billing::ChargeCard`). Queue names and
/// routing keys are derived from it, so it must be stable across releases.
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct ChargeCard { amount: u64 }
///
/// impl Message for ChargeCard {
///     const TYPE_NAME: &'static str = "billing::ChargeCard";
///     const KIND: MessageKind = MessageKind::Command;
/// }
/// ```
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    const TYPE_NAME: &'static str;
    const KIND: MessageKind;
}

/// A processor's disposition of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlerResult {
    /// Acknowledge; the delivery is removed.
    Accept,
    /// Reject permanently; the delivery is discarded.
    Reject,
    /// Reject and return the delivery to its queue.
    Requeue,
}

/// Control signal returned by every interceptor hook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum InterceptorResult {
    /// Continue the pipeline.
    #[default]
    Pass,
    /// Abandon the current message, keep the loop running.
    Skip,
    /// Abandon the current message and halt the loop.
    Stop,
}

impl InterceptorResult {
    #[must_use]
    pub fn is_pass(self) -> bool {
        self == Self::Pass
    }
}

/// A message on its way out, reduced to a JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub message_type: String,
    pub kind: MessageKind,
    pub payload: Value,
}

impl OutboundMessage {
    #[must_use]
    pub fn new(message_type: impl Into<String>, kind: MessageKind, payload: Value) -> Self {
        Self {
            message_type: message_type.into(),
            kind,
            payload,
        }
    }

    /// Build from a typed message.
    ///
    /// # Errors
    ///
    /// `BusError::Serialization` if the message cannot be converted to JSON.
    pub fn from_message<M: Message>(message: &M) -> BusResult<Self> {
        let payload = serde_json::to_value(message)
            .map_err(|e| BusError::Serialization(format!("{}: {e}", M::TYPE_NAME)))?;
        Ok(Self::new(M::TYPE_NAME, M::KIND, payload))
    }
}

/// A message decoded on the consuming side.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub message_type: String,
    pub kind: MessageKind,
    pub payload: Value,
    pub attributes: Attributes,
}

impl InboundMessage {
    #[must_use]
    pub fn new(
        message_type: impl Into<String>,
        kind: MessageKind,
        payload: Value,
        attributes: Attributes,
    ) -> Self {
        Self {
            message_type: message_type.into(),
            kind,
            payload,
            attributes,
        }
    }

    /// Decode the payload into its concrete type.
    ///
    /// # Errors
    ///
    /// `BusError::Deserialization` if the payload does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> BusResult<T> {
        T::deserialize(&self.payload).map_err(|e| {
            BusError::Deserialization(format!("cannot decode \"{}\": {e}", self.message_type))
        })
    }
}
