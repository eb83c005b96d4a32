//! # Error Types
//!
//! Defines the error taxonomy shared by the producer, the consumer, the router
//! and every transport.

use thiserror::Error;

/// Errors raised by a transport implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The envelope carries no delivery tag (it was never received).
    #[error("Envelope has no delivery tag")]
    MissingDeliveryTag,

    /// The delivery tag is unknown or was already acknowledged.
    #[error("Unknown delivery tag: {tag}")]
    UnknownDeliveryTag { tag: String },

    /// The backend failed.
    #[error("Transport backend error: {0}")]
    Backend(String),
}

/// Errors raised by the messaging core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Unknown type registered as a route endpoint, duplicate route, bad option.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A route lookup found no match.
    #[error("Route \"{key}\" not found")]
    RouteNotFound { key: String },

    /// A command was sent with no registered handler.
    #[error("There are no registered handlers for command \"{message_type}\"")]
    Unroutable { message_type: String },

    /// A payload could not be encoded.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Content-type/encoding mismatch, decode failure or unknown message type.
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// Locator miss for a command, or a processor that cannot take the message.
    #[error("Processor resolution failed: {0}")]
    ProcessorResolution(String),

    /// The decoded value is neither a command nor an event.
    #[error("Invalid message type \"{type_name}\": neither a command nor an event")]
    MessageType { type_name: String },

    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl BusError {
    /// Returns true for both routing failures (lookup miss, unroutable command).
    #[must_use]
    pub fn is_routing(&self) -> bool {
        matches!(self, Self::RouteNotFound { .. } | Self::Unroutable { .. })
    }
}

/// Result alias used throughout the core.
pub type BusResult<T> = Result<T, BusError>;
