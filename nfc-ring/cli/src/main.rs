//! NFC Ring CLI - Token Management from the Terminal
//!
//! Thin surface over `nfc-ring-core`: each subcommand performs one token
//! operation against the ring daemon and prints the result.
//!
//! # Usage
//!
//! ```bash
//! # List a user's rings
//! nfc-ring tokens alice
//!
//! # Wait for a ring on the reader, then register it
//! TOKEN=$(nfc-ring acquire)
//! NFC_RING_PASSWORD=secret nfc-ring add alice "$TOKEN"
//!
//! # Revoke a ring for the current login
//! nfc-ring remove 04a1b2c3
//!
//! # Talk to a daemon elsewhere, with verbose logging
//! nfc-ring --daemon 10.0.0.5:8080 -v tokens alice
//! ```
//!
//! # Signals
//!
//! - `SIGINT` (Ctrl-C): cancels `acquire`, noticed within one read timeout;
//!   terminates every other command immediately

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use nfc_ring_core::{
    default_config_path, load_config_from_path, ConfigOverrides, TcpConnector, TokenClient,
};

use commands::{execute, Command};

/// NFC Ring - manage NFC ring authentication tokens
#[derive(Parser, Debug)]
#[command(name = "nfc-ring")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Ring daemon address (host:port)
    #[arg(long = "daemon", value_name = "ADDR")]
    daemon_addr: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "NFC_RING_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Connection timeout in milliseconds
    #[arg(long, value_name = "MS")]
    connect_timeout: Option<u64>,

    /// Read timeout in milliseconds
    #[arg(long, value_name = "MS")]
    read_timeout: Option<u64>,

    /// Verbose logging (debug level)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::new();
        if let Some(ref addr) = self.daemon_addr {
            overrides = overrides.with_daemon_addr(addr.clone());
        }
        if let Some(ms) = self.connect_timeout {
            overrides = overrides.with_connect_timeout_ms(ms);
        }
        if let Some(ms) = self.read_timeout {
            overrides = overrides.with_read_timeout_ms(ms);
        }
        overrides
    }
}

/// Initialize logging
///
/// `RUST_LOG` wins when set. Logs go to stderr so command output on stdout
/// stays pipeable.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("nfc_ring={level},nfc_ring_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config = load_config_from_path(config_path).context("Failed to load configuration")?;
    args.overrides()
        .apply(&mut config)
        .context("Invalid command-line option")?;

    debug!(
        daemon = %config.transport.daemon_addr,
        source = %config.source(),
        "Configuration loaded"
    );

    let client = TokenClient::new(
        TcpConnector::from_config(&config.transport),
        config.client_options(),
    );

    // Other commands keep the default Ctrl-C behavior and exit at once
    let cancel = CancellationToken::new();
    if args.command.is_cancellable() {
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, cancelling");
                ctrl_c.cancel();
            }
        });
    }

    let output = execute(&client, &args.command, &cancel).await?;
    println!("{output}");

    Ok(())
}
