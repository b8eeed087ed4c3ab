//! TCP Transport
//!
//! Client-side connection to the ring daemon over TCP. Every operation opens
//! its own [`TcpChannel`] through a [`TcpConnector`] and drops it when done.
//!
//! ```text
//! ┌─────────────────┐                    ┌─────────────────┐
//! │  Token Client   │                    │   Ring Daemon   │
//! │                 │                    │                 │
//! │   TcpChannel    ├───────────────────►│   TCP listener  │
//! │                 │  framed JSON text  │                 │
//! │  request ──────►│                    │◄── request      │
//! │  ◄────── reply  │                    │    reply ──────►│
//! └─────────────────┘                    └─────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;

use super::config::TransportConfig;
use super::frame::{encode, FrameDecoder};
use super::traits::{Connector, TokenChannel, TransportError};

/// Opens TCP connections to the daemon
#[derive(Clone, Debug)]
pub struct TcpConnector {
    addr: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl TcpConnector {
    /// Create a connector for `addr` with explicit timeouts
    pub fn new(addr: impl Into<String>, connect_timeout: Duration, read_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            read_timeout,
        }
    }

    /// Create a connector from transport configuration
    #[must_use]
    pub fn from_config(config: &TransportConfig) -> Self {
        Self::new(
            config.daemon_addr.clone(),
            config.connect_timeout(),
            config.read_timeout(),
        )
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Channel = TcpChannel;

    async fn connect(&self) -> Result<TcpChannel, TransportError> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                TransportError::ConnectionFailed(format!(
                    "Timed out connecting to {} after {:?}",
                    self.addr, self.connect_timeout
                ))
            })?
            .map_err(|e| {
                TransportError::ConnectionFailed(format!(
                    "Failed to connect to {}: {}",
                    self.addr, e
                ))
            })?;

        stream.set_nodelay(true)?;

        tracing::debug!(addr = %self.addr, "Connected to ring daemon");

        Ok(TcpChannel::new(stream, self.read_timeout))
    }
}

/// One TCP connection to the daemon
#[derive(Debug)]
pub struct TcpChannel {
    stream: TcpStream,
    decoder: FrameDecoder,
    read_timeout: Duration,
}

impl TcpChannel {
    /// Wrap an established stream
    #[must_use]
    pub fn new(stream: TcpStream, read_timeout: Duration) -> Self {
        Self {
            stream,
            decoder: FrameDecoder::new(),
            read_timeout,
        }
    }
}

#[async_trait]
impl TokenChannel for TcpChannel {
    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        let frame = encode(message.as_bytes())?;

        self.stream
            .write_all(&frame)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        self.stream
            .flush()
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn read_message(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let deadline = Instant::now() + self.read_timeout;
        let mut buf = [0u8; 4096];

        loop {
            if let Some(payload) = self.decoder.decode()? {
                return Ok(Some(payload));
            }

            // `read` is cancel-safe: bytes already pushed stay in the decoder.
            match tokio::time::timeout_at(deadline, self.stream.read(&mut buf)).await {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => {
                    tracing::debug!("Connection closed by daemon");
                    return Err(TransportError::ConnectionClosed);
                }
                Ok(Ok(n)) => self.decoder.push(&buf[..n]),
                Ok(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
            }
        }
    }
}
