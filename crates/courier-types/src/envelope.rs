//! # Envelope
//!
//! The transport-level carrier of a serialized message body plus its delivery
//! metadata.
//!
//! ## Value Semantics
//!
//! - Every `with_*` method consumes the envelope and returns a modified copy.
//!   An envelope handed to a transport can never be changed behind its back.
//! - `content_type()` falls back to `text/plain` when unset.
//! - `routing_key()` is the empty string when unset.
//! - `with_headers()` merges into the existing headers, it never replaces them.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::collections::BTreeMap;
use std::fmt;

/// Content type reported when the envelope does not declare one.
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// String-keyed header map. Values are arbitrary JSON values.
pub type Headers = BTreeMap<String, serde_json::Value>;

/// Delivery durability requested from the transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliveryMode {
    /// May be lost if the broker restarts.
    #[default]
    Transient = 1,
    /// Should survive a broker restart.
    Persistent = 2,
}

/// Message priority, ordered from `VeryLow` (1) to `VeryHigh` (5).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Priority {
    VeryLow = 1,
    Low = 2,
    #[default]
    Normal = 3,
    High = 4,
    VeryHigh = 5,
}

impl Priority {
    /// Numeric level (1-5).
    #[must_use]
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Parse a numeric level, `None` outside 1-5.
    #[must_use]
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::VeryLow),
            2 => Some(Self::Low),
            3 => Some(Self::Normal),
            4 => Some(Self::High),
            5 => Some(Self::VeryHigh),
            _ => None,
        }
    }
}

/// Opaque token identifying one in-flight delivery within one queue.
///
/// Assigned by the transport on receive. Required and sufficient to accept or
/// reject that specific delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryTag {
    sequence: u64,
    queue: String,
}

impl DeliveryTag {
    /// Create a tag for the given delivery sequence within `queue`.
    #[must_use]
    pub fn new(sequence: u64, queue: impl Into<String>) -> Self {
        Self {
            sequence,
            queue: queue.into(),
        }
    }

    /// Transport-assigned sequence number.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Queue the delivery was taken from.
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }
}

impl fmt::Display for DeliveryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.queue, self.sequence)
    }
}

/// Consumer-visible metadata projected from an envelope.
///
/// Handed to processors alongside the decoded payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
    pub app_id: String,
    pub correlation_id: String,
    pub expiration: String,
    pub headers: Headers,
    pub is_redelivery: bool,
    pub message_id: String,
    pub priority: Priority,
    pub reply_to: String,
    pub timestamp: Option<u64>,
    pub message_type: String,
    pub user_id: String,
}

/// The universal message carrier handed between producer, transport and consumer.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    // =========================================================================
    // PAYLOAD SECTION
    // =========================================================================
    #[serde_as(as = "Bytes")]
    body: Vec<u8>,
    content_type: String,
    content_encoding: String,
    message_type: String,

    // =========================================================================
    // IDENTITY SECTION
    // =========================================================================
    message_id: String,
    correlation_id: String,
    app_id: String,
    user_id: String,
    reply_to: String,

    // =========================================================================
    // DELIVERY SECTION
    // =========================================================================
    routing_key: String,
    exchange: String,
    delivery_mode: DeliveryMode,
    priority: Priority,
    expiration: String,
    /// Unix timestamp (seconds since epoch) of message creation.
    timestamp: Option<u64>,
    headers: Headers,

    // =========================================================================
    // TRANSPORT SECTION (stamped on receive)
    // =========================================================================
    is_redelivery: bool,
    delivery_tag: Option<DeliveryTag>,
}

impl Envelope {
    /// Create an envelope carrying `body` with every other field unset.
    #[must_use]
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Declared content type, `text/plain` when unset.
    pub fn content_type(&self) -> &str {
        if self.content_type.is_empty() {
            DEFAULT_CONTENT_TYPE
        } else {
            &self.content_type
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn content_encoding(&self) -> &str {
        &self.content_encoding
    }

    #[must_use]
    pub fn with_content_encoding(mut self, content_encoding: impl Into<String>) -> Self {
        self.content_encoding = content_encoding.into();
        self
    }

    /// Name of the message type carried in the body.
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    #[must_use]
    pub fn with_message_type(mut self, message_type: impl Into<String>) -> Self {
        self.message_type = message_type.into();
        self
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    #[must_use]
    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = message_id.into();
        self
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    #[must_use]
    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn reply_to(&self) -> &str {
        &self.reply_to
    }

    #[must_use]
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = reply_to.into();
        self
    }

    /// Routing key, empty when unset.
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    #[must_use]
    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = routing_key.into();
        self
    }

    /// Exchange/queue hint for transports that support one.
    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    #[must_use]
    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery_mode
    }

    #[must_use]
    pub fn with_delivery_mode(mut self, delivery_mode: DeliveryMode) -> Self {
        self.delivery_mode = delivery_mode;
        self
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn expiration(&self) -> &str {
        &self.expiration
    }

    #[must_use]
    pub fn with_expiration(mut self, expiration: impl Into<String>) -> Self {
        self.expiration = expiration.into();
        self
    }

    pub fn timestamp(&self) -> Option<u64> {
        self.timestamp
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Option<u64>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Value of a single header, `None` when absent.
    pub fn header(&self, name: &str) -> Option<&serde_json::Value> {
        self.headers.get(name)
    }

    /// Set (or overwrite) a single header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Merge `headers` into the existing header map. Incoming keys win.
    #[must_use]
    pub fn with_headers<I, K>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(name, value)| (name.into(), value)));
        self
    }

    pub fn is_redelivery(&self) -> bool {
        self.is_redelivery
    }

    #[must_use]
    pub fn with_redelivery(mut self, is_redelivery: bool) -> Self {
        self.is_redelivery = is_redelivery;
        self
    }

    /// Transport-assigned delivery tag, present only on received envelopes.
    pub fn delivery_tag(&self) -> Option<&DeliveryTag> {
        self.delivery_tag.as_ref()
    }

    #[must_use]
    pub fn with_delivery_tag(mut self, delivery_tag: DeliveryTag) -> Self {
        self.delivery_tag = Some(delivery_tag);
        self
    }

    #[must_use]
    pub fn without_delivery_tag(mut self) -> Self {
        self.delivery_tag = None;
        self
    }

    /// Project the consumer-visible metadata.
    #[must_use]
    pub fn attributes(&self) -> Attributes {
        Attributes {
            app_id: self.app_id.clone(),
            correlation_id: self.correlation_id.clone(),
            expiration: self.expiration.clone(),
            headers: self.headers.clone(),
            is_redelivery: self.is_redelivery,
            message_id: self.message_id.clone(),
            priority: self.priority,
            reply_to: self.reply_to.clone(),
            timestamp: self.timestamp,
            message_type: self.message_type.clone(),
            user_id: self.user_id.clone(),
        }
    }
}
