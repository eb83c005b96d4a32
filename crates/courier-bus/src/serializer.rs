//! # Serializers
//!
//! Body encoding. The content type and encoding a serializer declares are
//! stamped on every envelope it produces, and the consumer refuses envelopes
//! whose declarations do not match exactly.

use courier_types::{BusError, BusResult};
use serde_json::Value;

pub trait Serializer {
    /// # Errors
    ///
    /// `BusError::Serialization` when the value cannot be encoded.
    fn serialize(&self, value: &Value) -> BusResult<Vec<u8>>;

    /// # Errors
    ///
    /// `BusError::Deserialization` when the bytes cannot be decoded.
    fn unserialize(&self, body: &[u8]) -> BusResult<Value>;

    fn content_type(&self) -> &str;

    fn content_encoding(&self) -> &str;
}

/// JSON body encoding.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub const CONTENT_TYPE: &'static str = "application/vnd.courier+json-serialized";
    pub const CONTENT_ENCODING: &'static str = "string";
}

impl Serializer for JsonSerializer {
    fn serialize(&self, value: &Value) -> BusResult<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| BusError::Serialization(e.to_string()))
    }

    fn unserialize(&self, body: &[u8]) -> BusResult<Value> {
        serde_json::from_slice(body).map_err(|e| BusError::Deserialization(e.to_string()))
    }

    fn content_type(&self) -> &str {
        Self::CONTENT_TYPE
    }

    fn content_encoding(&self) -> &str {
        Self::CONTENT_ENCODING
    }
}
