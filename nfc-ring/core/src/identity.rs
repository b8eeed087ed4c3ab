//! User Identity
//!
//! The user on whose behalf requests are made, passed explicitly to the
//! operations that need it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default number of ring slots per user
///
/// Slot ids run from `01` to `MAX_TOKENS_COUNT - 1`.
pub const MAX_TOKENS_COUNT: u32 = 10;

/// Active user
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserIdentity {
    username: String,
}

impl UserIdentity {
    /// Identity for `username`
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// Identity of the user running this process
    ///
    /// Reads `USER`, then `USERNAME`. Returns `None` when neither is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .ok()
            .filter(|name| !name.is_empty())
            .map(Self::new)
    }

    /// Username
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_username() {
        let identity = UserIdentity::new("alice");
        assert_eq!(identity.username(), "alice");
        assert_eq!(identity.to_string(), "alice");
    }
}
