//! Authenticated actor identity threaded through every mutating call.

use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest identifier accepted from an identity provider.
pub const MAX_ACTOR_LEN: usize = 200;

/// A non-blank, trimmed user identifier supplied by the caller's identity
/// provider. There is no placeholder or default actor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Actor(String);

impl Actor {
    /// Validate and wrap an identity.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] when the id is blank, too long,
    /// or contains control characters.
    pub fn new(id: impl AsRef<str>) -> Result<Self> {
        let trimmed = id.as_ref().trim();
        if trimmed.is_empty() {
            return Err(LedgerError::Unauthorized(
                "an actor identity is required".to_string(),
            ));
        }
        if trimmed.len() > MAX_ACTOR_LEN {
            return Err(LedgerError::Unauthorized(format!(
                "actor identity exceeds {MAX_ACTOR_LEN} bytes"
            )));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(LedgerError::Unauthorized(
                "actor identity contains control characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Actor {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Actor> for String {
    fn from(actor: Actor) -> Self {
        actor.0
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_accepts() {
        let actor = Actor::new("  alice@example.com ").expect("valid");
        assert_eq!(actor.as_str(), "alice@example.com");
    }

    #[test]
    fn blank_is_unauthorized() {
        for raw in ["", "   ", "\t"] {
            let err = Actor::new(raw).expect_err("blank actor");
            assert!(matches!(err, LedgerError::Unauthorized(_)));
            assert_eq!(err.http_status(), 401);
        }
    }

    #[test]
    fn control_characters_rejected() {
        assert!(Actor::new("bob\u{0}").is_err());
        assert!(Actor::new("a\nb").is_err());
    }

    #[test]
    fn oversized_rejected() {
        assert!(Actor::new("x".repeat(MAX_ACTOR_LEN + 1)).is_err());
        assert!(Actor::new("x".repeat(MAX_ACTOR_LEN)).is_ok());
    }

    #[test]
    fn serde_validates() {
        let ok: Actor = serde_json::from_str("\"carol\"").expect("deserialize");
        assert_eq!(ok.as_str(), "carol");
        assert!(serde_json::from_str::<Actor>("\"  \"").is_err());
    }
}
