//! NFC Ring Core - Token Client for the NFC Ring Daemon
//!
//! This crate lets a user interface list, register and revoke the NFC-ring
//! authentication tokens held by a background daemon, and wait for the reader
//! to report a newly presented ring. It has no UI dependencies.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    UI Surface (CLI, GUI)                      │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │ get / add / remove / acquire
//! ┌──────────────────────────────┼───────────────────────────────┐
//! │                       NFC RING CORE                          │
//! │  ┌───────────────────────────┴────────────────────────────┐  │
//! │  │                     TokenClient                        │  │
//! │  │  ┌────────────┐  ┌────────────┐  ┌──────────────────┐  │  │
//! │  │  │  Messages  │  │   Codec    │  │ Ring name policy │  │  │
//! │  │  └────────────┘  └────────────┘  └──────────────────┘  │  │
//! │  └───────────────────────────┬────────────────────────────┘  │
//! │                  Connector / TokenChannel                     │
//! │                     (framed JSON over TCP)                    │
//! └──────────────────────────────┼───────────────────────────────┘
//!                                │
//!                          Ring Daemon
//! ```
//!
//! # Quick Start
//!
//! ```ignore
//! use nfc_ring_core::{load_config, TcpConnector, TokenClient};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = load_config()?;
//! let client = TokenClient::new(
//!     TcpConnector::from_config(&config.transport),
//!     config.client_options(),
//! );
//!
//! let cancel = CancellationToken::new();
//! if let Some(token) = client.acquire_new_token(&cancel).await? {
//!     let ring = client.add_token("alice", "secret", &token).await?;
//!     println!("registered as {ring}");
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`messages`]: Request/response envelope and user state snapshot
//! - [`codec`]: JSON text encoding of messages
//! - [`transport`]: Connection to the daemon (TCP, in-process)
//! - [`identity`]: Explicit user identity and slot bound
//! - [`ring_name`]: Friendly name allocation for new rings
//! - [`client`]: The token client operations
//! - [`config`]: TOML/env/CLI configuration loading
//! - [`error`]: Client error type

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod identity;
pub mod messages;
pub mod ring_name;
pub mod transport;

// Re-exports for convenience
pub use client::{ClientOptions, TokenClient};
pub use codec::CodecError;
pub use config::{
    default_config_path, load_config, load_config_from_path, ClientConfig, ConfigError,
    ConfigOverrides, ConfigSource,
};
pub use error::ClientError;
pub use identity::{UserIdentity, MAX_TOKENS_COUNT};
pub use messages::{MessageType, TokenMessage, UserConfiguration, UserServerState};
pub use ring_name::{next_ring_name, RingName};
pub use transport::{
    Connector, DaemonEnd, InProcessConnector, InProcessTransport, TcpConnector, TokenChannel,
    TransportConfig, TransportError,
};
