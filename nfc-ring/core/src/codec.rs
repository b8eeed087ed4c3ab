//! Message Codec
//!
//! JSON text encoding of [`TokenMessage`](crate::messages::TokenMessage) and
//! [`UserServerState`](crate::messages::UserServerState).
//!
//! Decoding works on the raw payload bytes of a frame. An empty payload is not
//! a decode error: it means the daemon had nothing to say, and [`decode`]
//! reports it as `Ok(None)`. Anything else that is not valid JSON for the
//! expected type, invalid UTF-8 included, is a malformed message.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Errors produced by the codec
#[derive(Debug, Error)]
pub enum CodecError {
    /// Non-empty payload that does not parse as the expected message
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// Message could not be serialized
    #[error("Failed to encode message: {0}")]
    Encode(String),
}

/// Encode a message as JSON text
///
/// # Errors
///
/// Returns `CodecError::Encode` if serialization fails.
pub fn encode<T: Serialize>(msg: &T) -> Result<String, CodecError> {
    serde_json::to_string(msg).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decode a JSON payload into a message
///
/// Returns `Ok(None)` for an empty or whitespace-only payload.
///
/// # Errors
///
/// Returns `CodecError::MalformedMessage` if the payload is non-empty and
/// does not parse.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<Option<T>, CodecError> {
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice(payload)
        .map(Some)
        .map_err(|e| CodecError::MalformedMessage(e.to_string()))
}
