//! Bearer token supply for backend requests.

use std::sync::RwLock;

use super::GatewayError;

/// Source of the bearer token attached to every backend request.
///
/// Session management lives outside the agent; the host either configures a
/// static token or pushes a fresh one after login.
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Option<String>;

    /// The token, or [`GatewayError::MissingToken`] if there is none.
    fn require_token(&self) -> Result<String, GatewayError> {
        self.token()
            .filter(|t| !t.trim().is_empty())
            .ok_or(GatewayError::MissingToken)
    }
}

/// A token held in memory, replaceable at runtime.
#[derive(Debug, Default)]
pub struct StaticToken {
    token: RwLock<Option<String>>,
}

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    pub fn set(&self, token: Option<String>) {
        if let Ok(mut guard) = self.token.write() {
            *guard = token;
        }
    }
}

impl CredentialProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }
}
