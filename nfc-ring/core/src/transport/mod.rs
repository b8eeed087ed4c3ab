//! Transport Layer for Client-Daemon IPC
//!
//! Provides abstraction over the connection to the ring daemon:
//! - `Tcp`: framed messages over a TCP connection (production)
//! - `InProcess`: channel pair standing in for the daemon (tests, embedding)
//!
//! # Design Philosophy
//!
//! The token client never touches sockets directly. It asks a [`Connector`]
//! for a fresh [`TokenChannel`] per operation and exchanges message text on
//! it. Framing, timeouts and connection setup live here.

pub mod config;
pub mod frame;
pub mod in_process;
pub mod tcp;
pub mod traits;

// Re-exports for convenience
pub use config::TransportConfig;
pub use frame::FrameDecoder;
pub use in_process::{DaemonEnd, InProcessChannel, InProcessConnector, InProcessTransport};
pub use tcp::{TcpChannel, TcpConnector};
pub use traits::{Connector, TokenChannel, TransportError};
