//! # Envelope Signatures
//!
//! HMAC-SHA256 over the envelope body, carried in the `signature` header as
//! `sha256:<hex>`. The producer side signs, the consumer side verifies and
//! drops anything that does not check out.

use super::{Middleware, Next};
use courier_types::{BusError, BusResult, Envelope};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "signature";
const SIGNATURE_PREFIX: &str = "sha256:";

fn check_key(key: &[u8]) -> BusResult<Vec<u8>> {
    if key.iter().all(u8::is_ascii_whitespace) {
        return Err(BusError::Configuration("signing key must not be empty".into()));
    }
    Ok(key.to_vec())
}

fn mac_for(key: &[u8], body: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(body);
    Some(mac)
}

/// Signs envelopes that carry no signature yet.
#[derive(Clone)]
pub struct SignedEnvelopeMiddleware {
    key: Vec<u8>,
}

impl SignedEnvelopeMiddleware {
    /// # Errors
    ///
    /// `BusError::Configuration` when the key is empty or blank.
    pub fn new(key: impl AsRef<[u8]>) -> BusResult<Self> {
        Ok(Self {
            key: check_key(key.as_ref())?,
        })
    }

    /// Signature header value for `body`.
    #[must_use]
    pub fn sign(&self, body: &[u8]) -> String {
        let digest = mac_for(&self.key, body)
            .map(|mac| hex::encode(mac.finalize().into_bytes()))
            .unwrap_or_default();
        format!("{SIGNATURE_PREFIX}{digest}")
    }
}

impl Middleware for SignedEnvelopeMiddleware {
    fn handle(&self, envelope: Envelope, next: Next<'_>) {
        let signed = envelope
            .header(SIGNATURE_HEADER)
            .and_then(serde_json::Value::as_str)
            .is_some_and(|s| !s.is_empty());
        if signed {
            return next.run(envelope);
        }
        let signature = self.sign(envelope.body());
        next.run(envelope.with_header(SIGNATURE_HEADER, signature));
    }
}

/// Drops envelopes whose signature is missing or does not match.
#[derive(Clone)]
pub struct SignatureVerificationMiddleware {
    key: Vec<u8>,
}

impl SignatureVerificationMiddleware {
    /// # Errors
    ///
    /// `BusError::Configuration` when the key is empty or blank.
    pub fn new(key: impl AsRef<[u8]>) -> BusResult<Self> {
        Ok(Self {
            key: check_key(key.as_ref())?,
        })
    }

    /// Constant-time check of a `sha256:<hex>` signature against `body`.
    #[must_use]
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        let Some(encoded) = signature.strip_prefix(SIGNATURE_PREFIX) else {
            return false;
        };
        let Ok(expected) = hex::decode(encoded) else {
            return false;
        };
        mac_for(&self.key, body).is_some_and(|mac| mac.verify_slice(&expected).is_ok())
    }
}

impl Middleware for SignatureVerificationMiddleware {
    fn handle(&self, envelope: Envelope, next: Next<'_>) {
        let valid = envelope
            .header(SIGNATURE_HEADER)
            .and_then(serde_json::Value::as_str)
            .is_some_and(|signature| self.verify(envelope.body(), signature));
        if valid {
            next.run(envelope);
        } else {
            warn!(
                message_id = envelope.message_id(),
                message_type = envelope.message_type(),
                "Dropping envelope with missing or invalid signature"
            );
        }
    }
}
