//! Client Errors

use thiserror::Error;

use crate::codec::CodecError;
use crate::transport::TransportError;

/// Errors surfaced by [`TokenClient`](crate::client::TokenClient) operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connecting to or talking with the daemon failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The daemon replied with something that is not a valid message
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Another request is already in flight on this client (payload names the rejected operation)
    #[error("Client busy: cannot start {0} while another request is in flight")]
    Busy(&'static str),
}

impl ClientError {
    /// Whether this error is a malformed reply from the daemon
    #[must_use]
    pub fn is_malformed_message(&self) -> bool {
        matches!(self, Self::Codec(CodecError::MalformedMessage(_)))
    }
}
