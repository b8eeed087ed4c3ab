//! Subcommand Execution
//!
//! Maps each subcommand onto one [`TokenClient`] operation and renders the
//! result as text for the terminal.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Subcommand;
use tokio_util::sync::CancellationToken;
use tracing::info;

use nfc_ring_core::{Connector, RingName, TokenClient, UserIdentity};

/// Token operations
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List the rings registered for a user
    Tokens {
        /// User whose rings to list
        user: String,

        /// Print the raw token mapping as JSON
        #[arg(long)]
        json: bool,
    },

    /// Register a ring token for a user
    Add {
        /// User to register the ring for
        user: String,

        /// Ring token (as reported by `acquire`)
        token: String,

        /// User password
        #[arg(long, env = "NFC_RING_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Revoke a ring token
    Remove {
        /// Ring token to revoke
        token: String,

        /// User the ring belongs to (defaults to the current login)
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Wait for a ring to be presented to the reader and print its token
    Acquire,
}

impl Command {
    /// Whether the command waits on the daemon until cancelled
    #[must_use]
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Acquire)
    }
}

/// Run one command and return what should be printed
///
/// # Errors
///
/// Propagates client errors from operations that read a reply.
pub async fn execute<C: Connector>(
    client: &TokenClient<C>,
    command: &Command,
    cancel: &CancellationToken,
) -> Result<String> {
    match command {
        Command::Tokens { user, json } => {
            let Some(tokens) = client.get_tokens(user).await? else {
                return Ok(format!("No answer from the ring daemon for {user}"));
            };

            // Sorted for stable output
            let tokens: BTreeMap<String, String> = tokens.into_iter().collect();
            if *json {
                return Ok(serde_json::to_string_pretty(&tokens)?);
            }
            if tokens.is_empty() {
                return Ok(format!("{user} has no rings"));
            }

            let lines: Vec<String> = tokens
                .iter()
                .map(|(token, name)| format!("{name}\t{token}"))
                .collect();
            Ok(lines.join("\n"))
        }

        Command::Add {
            user,
            token,
            password,
        } => {
            let ring = client.add_token(user, password, token).await?;
            info!(user = %user, ring = %ring, "Registration sent");
            Ok(match ring {
                RingName::Allocated { .. } => format!("Registered {token} as \"{ring}\""),
                RingName::Exhausted => format!(
                    "Registered {token} as \"{ring}\" (no free ring slot left for {user})"
                ),
            })
        }

        Command::Remove { token, user } => {
            let identity = user
                .clone()
                .map(UserIdentity::new)
                .or_else(UserIdentity::from_env)
                .context("Cannot tell whose ring to remove; pass --user")?;
            client.remove_token(&identity, token).await?;
            Ok(format!("Removal of {token} for {identity} sent"))
        }

        Command::Acquire => {
            info!("Waiting for a ring, press Ctrl-C to cancel");
            match client.acquire_new_token(cancel).await? {
                Some(token) if !token.is_empty() => Ok(token),
                _ if cancel.is_cancelled() => Ok("Cancelled".to_string()),
                _ => Ok("The daemon reported a ring without a token".to_string()),
            }
        }
    }
}
