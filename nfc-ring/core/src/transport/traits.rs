//! Transport Traits
//!
//! Core trait definitions for client-daemon communication.
//!
//! Two traits split the transport capability:
//! - `Connector`: opens a fresh connection to the daemon (one per operation)
//! - `TokenChannel`: sends and receives framed text messages on that connection

use std::fmt;

use async_trait::async_trait;

/// Errors that can occur during transport operations
#[derive(Debug)]
pub enum TransportError {
    /// Connection to the daemon failed
    ConnectionFailed(String),
    /// Connection was closed by the peer
    ConnectionClosed,
    /// Failed to send message
    SendFailed(String),
    /// Failed to receive message
    ReceiveFailed(String),
    /// IO error from underlying transport
    IoError(std::io::Error),
    /// Frame length exceeds the allowed maximum
    FrameTooLarge {
        /// Size that was requested or announced
        size: usize,
        /// Maximum allowed size
        max: usize,
    },
    /// Frame checksum mismatch - data corruption detected
    ChecksumMismatch {
        /// Expected checksum value
        expected: u32,
        /// Actual checksum value received
        actual: u32,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed(msg) => write!(f, "Connection failed: {msg}"),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::SendFailed(msg) => write!(f, "Send failed: {msg}"),
            Self::ReceiveFailed(msg) => write!(f, "Receive failed: {msg}"),
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::FrameTooLarge { size, max } => {
                write!(f, "Frame too large: {size} bytes (max: {max})")
            }
            Self::ChecksumMismatch { expected, actual } => write!(
                f,
                "Checksum mismatch: expected {expected:#010x}, got {actual:#010x}"
            ),
        }
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err)
    }
}

/// One open connection to the ring daemon
///
/// Carries one message per frame in each direction. Framing is the channel's
/// business; callers send message text and read back raw payloads, which the
/// codec interprets.
#[async_trait]
pub trait TokenChannel: Send {
    /// Send one message
    async fn send(&mut self, message: &str) -> Result<(), TransportError>;

    /// Block until a message arrives or the read timeout elapses
    ///
    /// Returns `Ok(None)` when no message arrived in time. A frame with an
    /// empty payload is returned as an empty buffer; interpreting it is up to
    /// the codec.
    async fn read_message(&mut self) -> Result<Option<Vec<u8>>, TransportError>;
}

/// Opens connections to the ring daemon
#[async_trait]
pub trait Connector: Send + Sync {
    /// Channel type produced by this connector
    type Channel: TokenChannel;

    /// Open a new connection
    async fn connect(&self) -> Result<Self::Channel, TransportError>;
}
