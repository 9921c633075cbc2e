//! The client-roundtripped upload policy token.
//!
//! The wire format is base64 over JSON `{"types": "jpg,png", "size": bytes}`,
//! minted at config render and echoed back with every upload. It is a
//! parameter carrier only: the token is deliberately not signed (behavior
//! parity with the system this replaces), so it must never be treated as a
//! security boundary on its own.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Invalid policy token encoding")]
    InvalidEncoding,

    #[error("Invalid policy token payload")]
    InvalidPayload,
}

/// Wire shape of the token.
#[derive(Debug, Serialize, Deserialize)]
struct PolicyTokenPayload {
    types: String,
    size: u64,
}

/// Decoded upload constraints for a single widget instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    /// Allowed file types, each an extension (`jpg`) or a MIME type
    /// (`image/jpeg`), lowercased.
    pub allowed_types: Vec<String>,
    pub max_size_bytes: u64,
}

impl UploadPolicy {
    pub fn new(allowed_types: &[String], max_size_bytes: u64) -> Self {
        Self {
            allowed_types: allowed_types
                .iter()
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            max_size_bytes,
        }
    }

    /// Encodes the policy into its client-visible token form.
    pub fn encode(&self) -> String {
        let payload = PolicyTokenPayload {
            types: self.allowed_types.join(","),
            size: self.max_size_bytes,
        };

        // Serializing a two-field struct of owned values cannot fail.
        let json = serde_json::to_vec(&payload).unwrap_or_default();
        BASE64.encode(json)
    }

    /// Decodes a client-echoed token. Both a bad base64 wrapper and a bad
    /// JSON payload are reported as malformed, without detail leakage.
    pub fn decode(token: &str) -> Result<Self, PolicyError> {
        let raw = BASE64
            .decode(token.trim())
            .map_err(|_| PolicyError::InvalidEncoding)?;

        let payload: PolicyTokenPayload =
            serde_json::from_slice(&raw).map_err(|_| PolicyError::InvalidPayload)?;

        let allowed_types: Vec<String> = payload
            .types
            .split(',')
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(Self {
            allowed_types,
            max_size_bytes: payload.size,
        })
    }
}
