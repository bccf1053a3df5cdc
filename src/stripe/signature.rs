//! Stripe webhook signature verification.
//!
//! The `Stripe-Signature` header looks like `t=1492774577,v1=5257a8...,v1=...`.
//! The signed payload is `"{t}.{raw body}"`, keyed with the endpoint secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Stripe's recommended replay window.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Allowed clock skew for timestamps from the future.
const FUTURE_SKEW_SECS: i64 = 60;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header is malformed")]
    InvalidFormat,

    #[error("signature timestamp is not a number")]
    InvalidTimestamp,

    #[error("signature timestamp outside tolerance (age {age}s)")]
    OutsideTolerance { age: i64 },

    #[error("no signature matched the payload")]
    Mismatch,

    #[error("webhook secret is unusable")]
    InvalidSecret,
}

#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(&self, payload: &[u8], header: &str, now: i64) -> Result<(), SignatureError> {
        let mut timestamp = None;
        let mut candidates = Vec::new();

        for part in header.split(',') {
            if let Some(t) = part.trim().strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(sig) = part.trim().strip_prefix("v1=") {
                candidates.push(sig);
            }
        }

        let timestamp_str = timestamp.ok_or(SignatureError::InvalidFormat)?;
        if candidates.is_empty() {
            return Err(SignatureError::InvalidFormat);
        }

        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;

        let age = now - timestamp;
        if age > self.tolerance_secs || age < -FUTURE_SKEW_SECS {
            tracing::warn!(age, tolerance = self.tolerance_secs, "Stripe webhook timestamp rejected");
            return Err(SignatureError::OutsideTolerance { age });
        }

        let mac = self.mac_for(timestamp_str, payload)?;

        // verify_slice compares in constant time
        let matched = candidates.iter().any(|candidate| match hex::decode(candidate) {
            Ok(bytes) => mac.clone().verify_slice(&bytes).is_ok(),
            Err(_) => false,
        });

        if matched {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }

    /// Builds a header value the way Stripe does, for fixtures and replay tooling.
    pub fn sign(&self, payload: &[u8], timestamp: i64) -> Result<String, SignatureError> {
        let timestamp = timestamp.to_string();
        let mac = self.mac_for(&timestamp, payload)?;
        Ok(format!(
            "t={},v1={}",
            timestamp,
            hex::encode(mac.finalize().into_bytes())
        ))
    }

    fn mac_for(&self, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}
