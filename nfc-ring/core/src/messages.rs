//! Token Messages
//!
//! Messages exchanged between the token client and the NFC ring daemon.
//!
//! Every request and reply travels as a single [`TokenMessage`] envelope: a
//! required [`MessageType`] plus a set of optional fields. Only the fields that
//! belong to the message type carry meaning; the daemon ignores the rest.
//!
//! | Type                | Required fields                                   |
//! |---------------------|---------------------------------------------------|
//! | `GetState`          | `Username`                                        |
//! | `Delete`            | `Token`, `Username`                               |
//! | `RegisterToken`     | `Username`, `Password`, `Token`, `TokenFriendlyName` |
//! | `NewTokenAvailable` | none (`Token` may be absent or empty)             |
//!
//! The reply to `GetState` is not an envelope but a [`UserServerState`]
//! snapshot.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of a [`TokenMessage`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    /// Ask the daemon for a user's current token configuration
    GetState,
    /// Revoke a registered token
    Delete,
    /// Register a new token for a user
    RegisterToken,
    /// Daemon notification that a ring was presented to the reader
    NewTokenAvailable,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GetState => "GetState",
            Self::Delete => "Delete",
            Self::RegisterToken => "RegisterToken",
            Self::NewTokenAvailable => "NewTokenAvailable",
        };
        f.write_str(name)
    }
}

/// Request/response envelope
///
/// Build requests through the per-kind constructors so that only valid
/// payload combinations leave the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TokenMessage {
    /// Message kind (always set)
    #[serde(rename = "Type")]
    pub kind: MessageType,

    /// User the message refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// User password, only sent with `RegisterToken`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Opaque token identifier of a ring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Human-readable ring label, e.g. `ring 03`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_friendly_name: Option<String>,
}

impl TokenMessage {
    /// An envelope of the given kind with no payload
    #[must_use]
    pub fn new(kind: MessageType) -> Self {
        Self {
            kind,
            username: None,
            password: None,
            token: None,
            token_friendly_name: None,
        }
    }

    /// `GetState` request for `username`
    #[must_use]
    pub fn get_state(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            ..Self::new(MessageType::GetState)
        }
    }

    /// `Delete` request revoking `token` on behalf of `username`
    #[must_use]
    pub fn delete(username: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            token: Some(token.into()),
            ..Self::new(MessageType::Delete)
        }
    }

    /// `RegisterToken` request
    #[must_use]
    pub fn register_token(
        username: impl Into<String>,
        password: impl Into<String>,
        token: impl Into<String>,
        friendly_name: impl Into<String>,
    ) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
            token: Some(token.into()),
            token_friendly_name: Some(friendly_name.into()),
            ..Self::new(MessageType::RegisterToken)
        }
    }

    /// `NewTokenAvailable` notification carrying `token`
    #[must_use]
    pub fn new_token_available(token: Option<String>) -> Self {
        Self {
            token,
            ..Self::new(MessageType::NewTokenAvailable)
        }
    }

    /// Check that every field required by [`Self::kind`] is present
    ///
    /// # Errors
    ///
    /// Returns the name of the first missing field.
    pub fn validate(&self) -> Result<(), MissingField> {
        let required: &[(&'static str, bool)] = match self.kind {
            MessageType::GetState => &[("Username", self.username.is_some())],
            MessageType::Delete => &[
                ("Token", self.token.is_some()),
                ("Username", self.username.is_some()),
            ],
            MessageType::RegisterToken => &[
                ("Username", self.username.is_some()),
                ("Password", self.password.is_some()),
                ("Token", self.token.is_some()),
                ("TokenFriendlyName", self.token_friendly_name.is_some()),
            ],
            MessageType::NewTokenAvailable => &[],
        };

        match required.iter().find(|(_, present)| !present) {
            Some((field, _)) => Err(MissingField {
                kind: self.kind,
                field,
            }),
            None => Ok(()),
        }
    }
}

/// A message lacks a field its kind requires
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind} message is missing required field {field}")]
pub struct MissingField {
    /// Kind of the offending message
    pub kind: MessageType,
    /// Wire name of the missing field
    pub field: &'static str,
}

/// A user's tokens as configured on the daemon
///
/// `Tokens` may be `null` on the wire, which the daemon sends when it holds
/// no configuration for the user. That decodes as `None` and is kept apart
/// from an empty mapping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserConfiguration {
    /// Token id -> friendly name
    pub tokens: Option<HashMap<String, String>>,
}

/// Daemon snapshot of one user's state, the reply to `GetState`
///
/// `UserConfiguration` is required, so a reply of any other shape (such as a
/// stray `NewTokenAvailable` envelope) fails to decode instead of passing for
/// a user with no tokens.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserServerState {
    /// The user's token configuration
    pub user_configuration: UserConfiguration,
}

impl UserServerState {
    /// Snapshot holding `tokens`
    #[must_use]
    pub fn with_tokens(tokens: HashMap<String, String>) -> Self {
        Self {
            user_configuration: UserConfiguration {
                tokens: Some(tokens),
            },
        }
    }

    /// Consume the snapshot, keeping only the token mapping
    ///
    /// `None` when the daemon sent a `null` mapping.
    #[must_use]
    pub fn into_tokens(self) -> Option<HashMap<String, String>> {
        self.user_configuration.tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_produce_valid_messages() {
        assert!(TokenMessage::get_state("alice").validate().is_ok());
        assert!(TokenMessage::delete("alice", "04a1b2").validate().is_ok());
        assert!(
            TokenMessage::register_token("alice", "hunter2", "04a1b2", "ring 01")
                .validate()
                .is_ok()
        );
        assert!(TokenMessage::new_token_available(None).validate().is_ok());
    }

    #[test]
    fn test_validate_reports_missing_field() {
        let mut msg = TokenMessage::delete("alice", "04a1b2");
        msg.username = None;

        let err = msg.validate().unwrap_err();
        assert_eq!(err.kind, MessageType::Delete);
        assert_eq!(err.field, "Username");

        let msg = TokenMessage::new(MessageType::RegisterToken);
        assert_eq!(msg.validate().unwrap_err().field, "Username");
    }

    #[test]
    fn test_wire_field_names() {
        let msg = TokenMessage::register_token("alice", "pw", "tok", "ring 02");
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["Type"], "RegisterToken");
        assert_eq!(value["Username"], "alice");
        assert_eq!(value["Password"], "pw");
        assert_eq!(value["Token"], "tok");
        assert_eq!(value["TokenFriendlyName"], "ring 02");
    }

    #[test]
    fn test_absent_fields_are_omitted() {
        let json = serde_json::to_string(&TokenMessage::get_state("bob")).unwrap();
        assert!(!json.contains("Password"));
        assert!(!json.contains("Token"));
    }

    #[test]
    fn test_null_fields_decode_as_absent() {
        let msg: TokenMessage =
            serde_json::from_str(r#"{"Type":"NewTokenAvailable","Token":null}"#).unwrap();
        assert_eq!(msg.kind, MessageType::NewTokenAvailable);
        assert!(msg.token.is_none());
    }

    #[test]
    fn test_user_server_state_tokens() {
        let json = r#"{"UserConfiguration":{"Tokens":{"04a1":"ring 01","04b2":"ring 02"}}}"#;
        let state: UserServerState = serde_json::from_str(json).unwrap();
        let tokens = state.into_tokens().unwrap();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens["04a1"], "ring 01");
    }

    #[test]
    fn test_user_server_state_null_tokens() {
        let state: UserServerState =
            serde_json::from_str(r#"{"UserConfiguration":{"Tokens":null}}"#).unwrap();
        assert!(state.into_tokens().is_none());

        let state: UserServerState =
            serde_json::from_str(r#"{"UserConfiguration":{"Tokens":{}}}"#).unwrap();
        assert_eq!(state.into_tokens(), Some(HashMap::new()));
    }

    #[test]
    fn test_user_server_state_requires_configuration() {
        let envelope = r#"{"Type":"NewTokenAvailable","Token":"04a1"}"#;
        assert!(serde_json::from_str::<UserServerState>(envelope).is_err());
        assert!(serde_json::from_str::<UserServerState>("{}").is_err());
    }

    #[test]
    fn test_message_type_display() {
        assert_eq!(MessageType::GetState.to_string(), "GetState");
        assert_eq!(
            MessageType::NewTokenAvailable.to_string(),
            "NewTokenAvailable"
        );
    }
}
