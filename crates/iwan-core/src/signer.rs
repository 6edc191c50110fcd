//! HMAC-SHA256 request signing.
//!
//! The server re-derives the signature from the bytes it receives, so the
//! signed bytes and the transmitted bytes must be identical up to the
//! trailing `signature` key. [`Signer::sign`] inserts the timestamp, signs
//! the compact envelope, and leaves appending the signature to the caller.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use crate::error::CoreError;
use crate::types::{canonical_json, Envelope, SIGNATURE_KEY, TIMESTAMP_KEY};

type HmacSha256 = Hmac<Sha256>;

/// Authentication material produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMaterial {
    /// Milliseconds since the Unix epoch at signing time.
    pub timestamp: u64,
    /// Standard (padded) base64 of the HMAC-SHA256 digest.
    pub signature: String,
}

impl SignatureMaterial {
    /// Append the signature as the final parameter of `envelope`.
    pub fn attach(&self, envelope: &mut Envelope) {
        envelope.insert_param(SIGNATURE_KEY, Value::String(self.signature.clone()));
    }
}

/// Holds the keyed HMAC state for one secret key.
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer").finish_non_exhaustive()
    }
}

impl Signer {
    /// Key the HMAC with the UTF-8 bytes of `secret_key`.
    pub fn new(secret_key: &str) -> Result<Self, CoreError> {
        if secret_key.is_empty() {
            return Err(CoreError::Config("secret key must not be empty".to_owned()));
        }
        let mac = HmacSha256::new_from_slice(secret_key.as_bytes())
            .map_err(|e| CoreError::Config(format!("unusable secret key: {e}")))?;
        Ok(Self { mac })
    }

    /// Timestamp `envelope` with the current wall-clock time and sign it.
    pub fn sign(&self, envelope: &mut Envelope) -> Result<SignatureMaterial, CoreError> {
        self.sign_at(envelope, now_millis()?)
    }

    /// Sign `envelope` as of `timestamp` (milliseconds since the epoch).
    ///
    /// The timestamp is inserted into the parameters before the canonical
    /// bytes are computed. An envelope that already carries a signature is
    /// rejected.
    pub fn sign_at(
        &self,
        envelope: &mut Envelope,
        timestamp: u64,
    ) -> Result<SignatureMaterial, CoreError> {
        if envelope.is_signed() {
            return Err(CoreError::InvalidRequest(format!(
                "request `{}` is already signed",
                envelope.method()
            )));
        }

        envelope.insert_param(TIMESTAMP_KEY, Value::from(timestamp));
        let canonical = envelope.to_canonical_string()?;
        let signature = STANDARD.encode(self.digest(canonical.as_bytes()));

        Ok(SignatureMaterial {
            timestamp,
            signature,
        })
    }

    /// Check the signature of a transmitted request frame.
    ///
    /// The frame is re-parsed with its key order intact, `params.signature`
    /// is removed, and the HMAC of the re-serialized remainder is compared
    /// against it in constant time.
    pub fn verify(&self, frame: &str) -> Result<bool, CoreError> {
        let mut request: Value = serde_json::from_str(frame)
            .map_err(|e| CoreError::InvalidRequest(format!("request frame is not JSON: {e}")))?;
        let params = request
            .get_mut("params")
            .and_then(Value::as_object_mut)
            .ok_or_else(|| CoreError::InvalidRequest("request frame has no params".to_owned()))?;

        let Some(Value::String(signature)) = params.shift_remove(SIGNATURE_KEY) else {
            return Ok(false);
        };
        let Ok(expected) = STANDARD.decode(signature.as_bytes()) else {
            return Ok(false);
        };

        let unsigned = canonical_json(&request)
            .map_err(|e| CoreError::InvalidRequest(format!("re-serialize request frame: {e}")))?;
        let mut mac = self.mac.clone();
        mac.update(unsigned.as_bytes());
        Ok(mac.verify_slice(&expected).is_ok())
    }

    fn digest(&self, message: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.finalize().into_bytes().to_vec()
    }
}

fn now_millis() -> Result<u64, CoreError> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| CoreError::Config(format!("system clock is before the Unix epoch: {e}")))?;
    u64::try_from(elapsed.as_millis())
        .map_err(|_| CoreError::Config("system clock is out of range".to_owned()))
}
