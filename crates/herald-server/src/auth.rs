//! Credential verification.
//!
//! The `AUTH` command delegates the token check to an [`Authenticator`]. The
//! server ships [`StaticTokenAuthenticator`], backed by the token table in
//! settings.

use std::collections::HashMap;

use async_trait::async_trait;
use herald_settings::AuthSettings;

/// Resolves a credential token to the principal it authenticates as.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Return the principal for `token`, or `None` if the token is rejected.
    async fn verify(&self, token: &str) -> Option<String>;
}

/// Authenticator with a fixed token → principal table.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, String>,
}

impl StaticTokenAuthenticator {
    /// Build from `(token, principal)` pairs.
    pub fn new<I, T, P>(tokens: I) -> Self
    where
        I: IntoIterator<Item = (T, P)>,
        T: Into<String>,
        P: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|(t, p)| (t.into(), p.into()))
                .collect(),
        }
    }

    /// Build from the `auth` settings section.
    pub fn from_settings(settings: &AuthSettings) -> Self {
        Self::new(settings.tokens.clone())
    }

    /// Number of accepted tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no token is accepted.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn verify(&self, token: &str) -> Option<String> {
        if token.is_empty() {
            return None;
        }
        self.tokens.get(token).cloned()
    }
}
