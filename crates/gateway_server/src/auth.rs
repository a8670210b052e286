//! Token validation seam.
//!
//! The authentication store that issues and revokes server tokens is an
//! external collaborator; the gateway only needs a yes/no answer for the
//! token presented in a `SERVER_LOGIN` packet. Deployments plug their
//! store in behind [`TokenValidator`]; [`StaticTokenValidator`] covers
//! config-file token lists and tests.

use async_trait::async_trait;
use std::collections::HashSet;

/// Answers whether a presented token identifies an enabled game server.
#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// Whether `token` is valid and enabled. Implementations must not log
    /// the token value.
    async fn validate(&self, token: &str) -> bool;
}

/// Validator backed by a fixed token set, typically from the config file.
#[derive(Debug, Default)]
pub struct StaticTokenValidator {
    tokens: HashSet<String>,
}

impl StaticTokenValidator {
    pub fn new(tokens: impl IntoIterator<Item = String>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }
}

#[async_trait]
impl TokenValidator for StaticTokenValidator {
    async fn validate(&self, token: &str) -> bool {
        self.tokens.contains(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_validator_matches_exact_tokens() {
        let validator = StaticTokenValidator::new(vec!["alpha".to_string(), "beta".to_string()]);
        assert!(validator.validate("alpha").await);
        assert!(validator.validate("beta").await);
        assert!(!validator.validate("gamma").await);
        assert!(!validator.validate("").await);
    }
}
