//! In-Process Transport
//!
//! Channel-based stand-in for the ring daemon. The client side gets an
//! [`InProcessConnector`]; the other end, a [`DaemonEnd`], sees every message
//! the client sends and decides what the client reads.
//!
//! # Usage
//!
//! ```ignore
//! let (connector, mut daemon) = InProcessTransport::new_pair();
//! let client = TokenClient::new(connector, ClientOptions::default());
//!
//! daemon.reply(r#"{"Type":"NewTokenAvailable","Token":"04a1b2"}"#);
//! let token = client.acquire_new_token(&cancel).await?;
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use super::traits::{Connector, TokenChannel, TransportError};

/// How long an in-process read waits for a queued reply
const READ_TIMEOUT: Duration = Duration::from_millis(20);

/// Constructor namespace for connector/daemon pairs
pub struct InProcessTransport;

impl InProcessTransport {
    /// Create a connected connector/daemon pair
    #[must_use]
    pub fn new_pair() -> (InProcessConnector, DaemonEnd) {
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let connections = Arc::new(AtomicUsize::new(0));
        let reads = Arc::new(AtomicUsize::new(0));
        let refuse = Arc::new(AtomicBool::new(false));

        let connector = InProcessConnector {
            request_tx,
            reply_rx: Arc::new(Mutex::new(reply_rx)),
            read_timeout: READ_TIMEOUT,
            connections: Arc::clone(&connections),
            reads: Arc::clone(&reads),
            refuse: Arc::clone(&refuse),
        };

        let daemon = DaemonEnd {
            request_rx,
            reply_tx,
            connections,
            reads,
            refuse,
        };

        (connector, daemon)
    }
}

/// Client side of an in-process pair
#[derive(Clone)]
pub struct InProcessConnector {
    request_tx: mpsc::UnboundedSender<String>,
    reply_rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
    read_timeout: Duration,
    connections: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
    refuse: Arc<AtomicBool>,
}

#[async_trait]
impl Connector for InProcessConnector {
    type Channel = InProcessChannel;

    async fn connect(&self) -> Result<InProcessChannel, TransportError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed(
                "In-process daemon refused the connection".to_string(),
            ));
        }

        self.connections.fetch_add(1, Ordering::SeqCst);

        Ok(InProcessChannel {
            request_tx: self.request_tx.clone(),
            reply_rx: Arc::clone(&self.reply_rx),
            read_timeout: self.read_timeout,
            reads: Arc::clone(&self.reads),
        })
    }
}

/// One in-process connection
pub struct InProcessChannel {
    request_tx: mpsc::UnboundedSender<String>,
    reply_rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
    read_timeout: Duration,
    reads: Arc<AtomicUsize>,
}

#[async_trait]
impl TokenChannel for InProcessChannel {
    async fn send(&mut self, message: &str) -> Result<(), TransportError> {
        self.request_tx
            .send(message.to_string())
            .map_err(|_| TransportError::SendFailed("Daemon end dropped".to_string()))
    }

    async fn read_message(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let mut rx = self.reply_rx.lock().await;
        match tokio::time::timeout(self.read_timeout, rx.recv()).await {
            Err(_) => Ok(None),
            Ok(Some(reply)) => Ok(Some(reply)),
            Ok(None) => Err(TransportError::ConnectionClosed),
        }
    }
}

/// Daemon side of an in-process pair
pub struct DaemonEnd {
    request_rx: mpsc::UnboundedReceiver<String>,
    reply_tx: mpsc::UnboundedSender<Vec<u8>>,
    connections: Arc<AtomicUsize>,
    reads: Arc<AtomicUsize>,
    refuse: Arc<AtomicBool>,
}

impl DaemonEnd {
    /// Queue a reply payload for the client's next read
    pub fn reply(&self, message: impl Into<Vec<u8>>) {
        // The connector holds the receiver for as long as the client lives.
        let _ = self.reply_tx.send(message.into());
    }

    /// Next message the client sent, waiting up to `timeout`
    pub async fn next_request(&mut self, timeout: Duration) -> Option<String> {
        tokio::time::timeout(timeout, self.request_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Message the client already sent, without waiting
    pub fn try_next_request(&mut self) -> Option<String> {
        self.request_rx.try_recv().ok()
    }

    /// Number of connections opened so far
    #[must_use]
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Number of read attempts made so far
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make subsequent connection attempts fail
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Drop the inbound side so client sends fail
    pub fn close_requests(&mut self) {
        self.request_rx.close();
    }
}
