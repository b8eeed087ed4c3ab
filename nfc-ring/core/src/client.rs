//! Token Client
//!
//! Client-side proxy for the ring daemon's token capability: list a user's
//! rings, register a new ring, revoke a ring, and wait for the reader to
//! report a freshly presented ring.
//!
//! # Connections
//!
//! Every operation opens its own connection through the [`Connector`] and
//! drops it when the operation ends. Nothing is pooled or cached.
//!
//! # Single flight
//!
//! The wire protocol carries no request ids, so a reply can only be matched to
//! its request by assuming one exchange at a time. A `TokenClient` enforces
//! that: starting an operation while another is running on the same client
//! fails with [`ClientError::Busy`].
//!
//! # Fire-and-forget sends
//!
//! [`TokenClient::remove_token`] and the registration half of
//! [`TokenClient::add_token`] do not wait for a reply. Send failures on those
//! paths are logged and not returned; the daemon's own state is the source of
//! truth and can be re-read with [`TokenClient::get_tokens`].

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec::{self, CodecError};
use crate::error::ClientError;
use crate::identity::{UserIdentity, MAX_TOKENS_COUNT};
use crate::messages::{TokenMessage, UserServerState};
use crate::ring_name::{next_ring_name, RingName};
use crate::transport::config::DEFAULT_POLL_INTERVAL_MS;
use crate::transport::{Connector, TokenChannel};

/// Tunables for [`TokenClient`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientOptions {
    /// Sleep between empty polls in [`TokenClient::acquire_new_token`]
    pub poll_interval: Duration,

    /// Ring slots per user; ids run `01..max_tokens_count`
    ///
    /// Ids are two digits, so values above
    /// [`MAX_SLOT_COUNT`](crate::ring_name::MAX_SLOT_COUNT) allocate as if
    /// they were that limit.
    pub max_tokens_count: u32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_tokens_count: MAX_TOKENS_COUNT,
        }
    }
}

/// Client for the ring daemon's token operations
pub struct TokenClient<C: Connector> {
    connector: C,
    options: ClientOptions,
    in_flight: Mutex<()>,
}

impl<C: Connector> TokenClient<C> {
    /// Create a client that reaches the daemon through `connector`
    pub fn new(connector: C, options: ClientOptions) -> Self {
        Self {
            connector,
            options,
            in_flight: Mutex::new(()),
        }
    }

    /// Fetch the token mapping (token id -> friendly name) for `username`
    ///
    /// Returns `Ok(None)` when the daemon sent no reply within the read
    /// timeout or answered with a `null` mapping. That means "state unknown",
    /// not "no tokens". A reply that is not a user state snapshot is
    /// malformed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Transport` if the connection fails and
    /// `ClientError::Codec` if the reply is malformed.
    pub async fn get_tokens(
        &self,
        username: &str,
    ) -> Result<Option<HashMap<String, String>>, ClientError> {
        let _guard = self.begin("GetState")?;
        self.fetch_tokens(username).await
    }

    /// Revoke `token` for `identity`
    ///
    /// Fire-and-forget: no reply is read, and transport failures are logged
    /// rather than returned.
    pub async fn remove_token(
        &self,
        identity: &UserIdentity,
        token: &str,
    ) -> Result<(), ClientError> {
        let _guard = self.begin("Delete")?;

        let request = codec::encode(&TokenMessage::delete(identity.username(), token))?;
        self.send_unacknowledged(&request, "Delete").await;

        debug!(username = %identity, token = %token, "RemoveToken sent");
        Ok(())
    }

    /// Register `token` for `username`, naming it after the next free ring slot
    ///
    /// The user's current tokens are fetched first to pick the name. If the
    /// daemon does not answer that query, or answers with a `null` mapping,
    /// the user is treated as having no rings. The registration itself is
    /// fire-and-forget.
    ///
    /// Returns the allocated name; [`RingName::Exhausted`] means every slot was
    /// taken and the ring was registered under the `ring 00` sentinel.
    ///
    /// # Errors
    ///
    /// Returns an error only if fetching the existing tokens fails.
    pub async fn add_token(
        &self,
        username: &str,
        password: &str,
        token: &str,
    ) -> Result<RingName, ClientError> {
        let _guard = self.begin("RegisterToken")?;

        let ring_name = self.resolve_ring_name(username).await?;
        if !ring_name.is_allocated() {
            warn!(
                username = %username,
                max_tokens = self.options.max_tokens_count,
                "No free ring slot, registering under sentinel name"
            );
        }

        let request = codec::encode(&TokenMessage::register_token(
            username,
            password,
            token,
            ring_name.label(),
        ))?;
        self.send_unacknowledged(&request, "RegisterToken").await;

        debug!(username = %username, token = %token, ring = %ring_name, "AddToken sent");
        Ok(ring_name)
    }

    /// Wait for the daemon to report a newly presented ring
    ///
    /// Polls the connection until a non-empty message arrives and returns its
    /// `Token` field, which may itself be absent. Between empty reads the task
    /// sleeps for the configured poll interval.
    ///
    /// `cancel` is checked once per iteration before each read. A read already
    /// in progress is not interrupted, so cancellation can take up to one read
    /// timeout to be observed. A cancelled wait returns `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Transport` if the connection fails and
    /// `ClientError::Codec` if a reply is malformed or lacks a field its kind
    /// requires.
    pub async fn acquire_new_token(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, ClientError> {
        let _guard = self.begin("AcquireNewToken")?;

        if cancel.is_cancelled() {
            debug!("AcquireNewToken cancelled before start");
            return Ok(None);
        }

        let mut channel = self.connector.connect().await?;

        loop {
            if cancel.is_cancelled() {
                debug!("AcquireNewToken cancelled");
                return Ok(None);
            }

            if let Some(payload) = channel.read_message().await? {
                if let Some(message) = codec::decode::<TokenMessage>(&payload)? {
                    message
                        .validate()
                        .map_err(|e| CodecError::MalformedMessage(e.to_string()))?;
                    debug!(kind = %message.kind, token = ?message.token, "AcquireNewToken");
                    return Ok(message.token);
                }
            }

            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    fn begin(&self, operation: &'static str) -> Result<MutexGuard<'_, ()>, ClientError> {
        self.in_flight
            .try_lock()
            .map_err(|_| ClientError::Busy(operation))
    }

    async fn fetch_tokens(
        &self,
        username: &str,
    ) -> Result<Option<HashMap<String, String>>, ClientError> {
        let request = codec::encode(&TokenMessage::get_state(username))?;

        let mut channel = self.connector.connect().await?;
        channel.send(&request).await?;

        let Some(reply) = channel.read_message().await? else {
            debug!(username = %username, "GetTokens: no reply from daemon");
            return Ok(None);
        };

        let Some(state) = codec::decode::<UserServerState>(&reply)? else {
            debug!(username = %username, "GetTokens: empty reply from daemon");
            return Ok(None);
        };

        let Some(tokens) = state.into_tokens() else {
            debug!(username = %username, "GetTokens: daemon holds no configuration");
            return Ok(None);
        };

        debug!(username = %username, tokens = ?tokens, "GetTokens");
        Ok(Some(tokens))
    }

    async fn resolve_ring_name(&self, username: &str) -> Result<RingName, ClientError> {
        let existing = self.fetch_tokens(username).await?.unwrap_or_default();
        Ok(next_ring_name(
            existing.values(),
            self.options.max_tokens_count,
        ))
    }

    async fn send_unacknowledged(&self, request: &str, kind: &'static str) {
        let result = match self.connector.connect().await {
            Ok(mut channel) => channel.send(request).await,
            Err(e) => Err(e),
        };

        if let Err(e) = result {
            warn!(kind, error = %e, "Unacknowledged send failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageType;
    use crate::transport::{DaemonEnd, InProcessConnector, InProcessTransport};
    use std::io::Write;
    use std::sync::{Arc, Mutex as StdMutex};

    const WAIT: Duration = Duration::from_millis(200);

    fn client() -> (TokenClient<InProcessConnector>, DaemonEnd) {
        let (connector, daemon) = InProcessTransport::new_pair();
        let options = ClientOptions {
            poll_interval: Duration::from_millis(5),
            max_tokens_count: 5,
        };
        (TokenClient::new(connector, options), daemon)
    }

    fn state_reply(labels: &[(&str, &str)]) -> String {
        let tokens = labels
            .iter()
            .map(|(token, label)| ((*token).to_string(), (*label).to_string()))
            .collect();
        serde_json::to_string(&UserServerState::with_tokens(tokens)).unwrap()
    }

    async fn request(daemon: &mut DaemonEnd) -> TokenMessage {
        let text = daemon.next_request(WAIT).await.expect("request sent");
        serde_json::from_str(&text).unwrap()
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<StdMutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[tokio::test]
    async fn test_get_tokens_returns_mapping() {
        let (client, mut daemon) = client();
        daemon.reply(state_reply(&[("04a1", "ring 01"), ("04b2", "ring 02")]));

        let tokens = client.get_tokens("alice").await.unwrap().unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens["04b2"], "ring 02");

        let sent = request(&mut daemon).await;
        assert_eq!(sent, TokenMessage::get_state("alice"));
        assert_eq!(daemon.connections(), 1);
        assert_eq!(daemon.reads(), 1);
    }

    #[tokio::test]
    async fn test_get_tokens_no_data_is_absent() {
        let (client, _daemon) = client();

        let tokens = client.get_tokens("alice").await.unwrap();
        assert!(tokens.is_none());
    }

    #[tokio::test]
    async fn test_get_tokens_empty_payload_is_absent() {
        let (client, daemon) = client();
        daemon.reply("");

        assert!(client.get_tokens("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_tokens_no_data_logs_no_mapping() {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let (client, _daemon) = client();
        assert!(client.get_tokens("alice").await.unwrap().is_none());

        let logs = buffer.contents();
        assert!(logs.contains("no reply"));
        assert!(!logs.contains("tokens="));
    }

    #[tokio::test]
    async fn test_get_tokens_malformed_reply() {
        let (client, daemon) = client();
        daemon.reply("{not json");

        let err = client.get_tokens("alice").await.unwrap_err();
        assert!(err.is_malformed_message());
    }

    #[tokio::test]
    async fn test_get_tokens_null_mapping_is_absent() {
        let (client, daemon) = client();
        daemon.reply(r#"{"UserConfiguration":{"Tokens":null}}"#);

        assert!(client.get_tokens("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_tokens_empty_mapping_is_present() {
        let (client, daemon) = client();
        daemon.reply(r#"{"UserConfiguration":{"Tokens":{}}}"#);

        let tokens = client.get_tokens("alice").await.unwrap();
        assert_eq!(tokens, Some(HashMap::new()));
    }

    #[tokio::test]
    async fn test_get_tokens_wrong_message_is_malformed() {
        let (client, daemon) = client();
        daemon.reply(r#"{"Type":"NewTokenAvailable","Token":"04a1"}"#);

        let err = client.get_tokens("alice").await.unwrap_err();
        assert!(err.is_malformed_message());
    }

    #[tokio::test]
    async fn test_get_tokens_invalid_utf8_is_malformed() {
        let (client, daemon) = client();
        daemon.reply(vec![0xff, 0xfe, b'{']);

        let err = client.get_tokens("alice").await.unwrap_err();
        assert!(err.is_malformed_message());
    }

    #[tokio::test]
    async fn test_get_tokens_connection_refused() {
        let (client, daemon) = client();
        daemon.refuse_connections(true);

        let err = client.get_tokens("alice").await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
    }

    #[tokio::test]
    async fn test_remove_token_is_fire_and_forget() {
        let (client, mut daemon) = client();
        let identity = UserIdentity::new("alice");

        client.remove_token(&identity, "04a1").await.unwrap();

        let sent = request(&mut daemon).await;
        assert_eq!(sent.kind, MessageType::Delete);
        assert_eq!(sent.token.as_deref(), Some("04a1"));
        assert_eq!(sent.username.as_deref(), Some("alice"));
        assert_eq!(daemon.reads(), 0);
    }

    #[tokio::test]
    async fn test_remove_token_swallows_transport_failure() {
        let (client, daemon) = client();
        daemon.refuse_connections(true);

        let result = client
            .remove_token(&UserIdentity::new("alice"), "04a1")
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_add_token_allocates_next_ring() {
        let (client, mut daemon) = client();
        daemon.reply(state_reply(&[("04a1", "ring 01"), ("04b2", "ring 02")]));

        let name = client.add_token("alice", "hunter2", "04c3").await.unwrap();
        assert_eq!(name.label(), "ring 03");

        let query = request(&mut daemon).await;
        assert_eq!(query.kind, MessageType::GetState);

        let register = request(&mut daemon).await;
        assert_eq!(
            register,
            TokenMessage::register_token("alice", "hunter2", "04c3", "ring 03")
        );
        assert_eq!(daemon.connections(), 2);
    }

    #[tokio::test]
    async fn test_add_token_without_state_uses_first_slot() {
        let (client, mut daemon) = client();

        let name = client.add_token("alice", "pw", "04a1").await.unwrap();
        assert_eq!(name, RingName::Allocated { slot: 1 });

        let _query = request(&mut daemon).await;
        let register = request(&mut daemon).await;
        assert_eq!(register.token_friendly_name.as_deref(), Some("ring 01"));
    }

    #[tokio::test]
    async fn test_add_token_exhausted_uses_sentinel() {
        let (client, mut daemon) = client();
        daemon.reply(state_reply(&[
            ("a", "ring 01"),
            ("b", "ring 02"),
            ("c", "ring 03"),
            ("d", "ring 04"),
        ]));

        let name = client.add_token("alice", "pw", "e").await.unwrap();
        assert_eq!(name, RingName::Exhausted);

        let _query = request(&mut daemon).await;
        let register = request(&mut daemon).await;
        assert_eq!(register.token_friendly_name.as_deref(), Some("ring 00"));
    }

    #[tokio::test]
    async fn test_add_token_null_mapping_uses_first_slot() {
        let (client, mut daemon) = client();
        daemon.reply(r#"{"UserConfiguration":{"Tokens":null}}"#);

        let name = client.add_token("alice", "pw", "04a1").await.unwrap();
        assert_eq!(name, RingName::Allocated { slot: 1 });

        let _query = request(&mut daemon).await;
        let register = request(&mut daemon).await;
        assert_eq!(register.token_friendly_name.as_deref(), Some("ring 01"));
    }

    #[tokio::test]
    async fn test_add_token_wrong_message_does_not_register() {
        let (client, mut daemon) = client();
        daemon.reply(r#"{"Type":"NewTokenAvailable","Token":"x"}"#);

        let err = client.add_token("alice", "pw", "04a1").await.unwrap_err();
        assert!(err.is_malformed_message());

        let _query = request(&mut daemon).await;
        assert!(daemon.try_next_request().is_none());
    }

    #[tokio::test]
    async fn test_add_token_propagates_malformed_state() {
        let (client, mut daemon) = client();
        daemon.reply("42");

        let err = client.add_token("alice", "pw", "04a1").await.unwrap_err();
        assert!(err.is_malformed_message());

        let _query = request(&mut daemon).await;
        assert!(daemon.try_next_request().is_none());
    }

    #[tokio::test]
    async fn test_acquire_returns_first_token() {
        let (client, daemon) = client();
        daemon.reply(r#"{"Type":"NewTokenAvailable","Token":"04d4e5"}"#);

        let cancel = CancellationToken::new();
        let token = client.acquire_new_token(&cancel).await.unwrap();
        assert_eq!(token.as_deref(), Some("04d4e5"));
    }

    #[tokio::test]
    async fn test_acquire_polls_until_reply() {
        let (client, daemon) = client();
        let cancel = CancellationToken::new();

        let acquire = client.acquire_new_token(&cancel);
        let reply = async {
            tokio::time::sleep(Duration::from_millis(60)).await;
            daemon.reply(r#"{"Type":"NewTokenAvailable","Token":"late"}"#);
        };

        let (token, ()) = tokio::join!(acquire, reply);
        assert_eq!(token.unwrap().as_deref(), Some("late"));
        assert!(daemon.reads() > 1);
        assert_eq!(daemon.connections(), 1);
    }

    #[tokio::test]
    async fn test_acquire_skips_empty_payloads() {
        let (client, daemon) = client();
        daemon.reply("");
        daemon.reply(r#"{"Type":"NewTokenAvailable","Token":"after-empty"}"#);

        let token = client
            .acquire_new_token(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(token.as_deref(), Some("after-empty"));
    }

    #[tokio::test]
    async fn test_acquire_tokenless_reply() {
        let (client, daemon) = client();
        daemon.reply(r#"{"Type":"NewTokenAvailable"}"#);

        let token = client
            .acquire_new_token(&CancellationToken::new())
            .await
            .unwrap();
        assert!(token.is_none());
    }

    #[tokio::test]
    async fn test_acquire_empty_token_text() {
        let (client, daemon) = client();
        daemon.reply(r#"{"Type":"NewTokenAvailable","Token":""}"#);

        let token = client
            .acquire_new_token(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(token.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_acquire_pre_cancelled() {
        let (client, daemon) = client();
        daemon.reply(r#"{"Type":"NewTokenAvailable","Token":"unused"}"#);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let token = client.acquire_new_token(&cancel).await.unwrap();
        assert!(token.is_none());
        assert_eq!(daemon.reads(), 0);
    }

    #[tokio::test]
    async fn test_acquire_cancelled_while_polling() {
        let (client, daemon) = client();
        let cancel = CancellationToken::new();

        let acquire = client.acquire_new_token(&cancel);
        let trigger = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        };

        let (token, ()) = tokio::join!(acquire, trigger);
        assert!(token.unwrap().is_none());
        assert!(daemon.reads() >= 1);
    }

    #[tokio::test]
    async fn test_acquire_malformed_reply() {
        let (client, daemon) = client();
        daemon.reply("garbage");

        let err = client
            .acquire_new_token(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_malformed_message());
    }

    #[tokio::test]
    async fn test_acquire_incomplete_message_is_malformed() {
        let (client, daemon) = client();
        daemon.reply(r#"{"Type":"Delete","Token":"04a1"}"#);

        let err = client
            .acquire_new_token(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.is_malformed_message());
        assert!(err.to_string().contains("Username"));
    }

    #[tokio::test]
    async fn test_concurrent_request_rejected() {
        let (client, daemon) = client();
        let cancel = CancellationToken::new();

        let acquire = client.acquire_new_token(&cancel);
        let competing = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let result = client.get_tokens("alice").await;
            cancel.cancel();
            result
        };

        let (token, competing) = tokio::join!(acquire, competing);
        assert!(token.unwrap().is_none());
        assert!(matches!(competing, Err(ClientError::Busy("GetState"))));
        drop(daemon);
    }
}
