//! URL-safe, unpadded base64 codec for the JSON blobs carried in form fields
//! (`threeDSSessionData`, `threeDSMethodData`, `creq`, `cres`).
//!
//! Counterparts are inconsistent about padding, so decoding rebuilds it from the
//! length instead of trusting the sender.

use crate::error::{PaymentError, Result};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encodes bytes as URL-safe base64 without padding.
pub fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decodes URL-safe base64 with or without trailing `=` padding.
pub fn decode(value: &str) -> Result<Vec<u8>> {
    let mut standard: String = value
        .trim()
        .chars()
        .map(|c| match c {
            '_' => '/',
            '-' => '+',
            other => other,
        })
        .collect();

    match standard.len() % 4 {
        0 => {}
        2 => standard.push_str("=="),
        3 => standard.push('='),
        _ => {
            return Err(PaymentError::MalformedPayload(format!(
                "invalid base64 length {}",
                value.trim().len()
            )));
        }
    }

    STANDARD
        .decode(standard.as_bytes())
        .map_err(|e| PaymentError::MalformedPayload(e.to_string()))
}

/// Serializes `payload` to JSON and encodes it.
pub fn encode_json<T: Serialize>(payload: &T) -> Result<String> {
    let json = serde_json::to_vec(payload)?;
    Ok(encode(&json))
}

/// Decodes `value` and parses the JSON document inside it.
pub fn decode_json<T: DeserializeOwned>(value: &str) -> Result<T> {
    let bytes = decode(value)?;
    serde_json::from_slice(&bytes).map_err(|e| PaymentError::MalformedPayload(e.to_string()))
}
