// ABOUTME: Credential provider seam for per-user OAuth tokens
// ABOUTME: In-memory store for embedding and tests, plus an environment-backed single-token provider

use crate::error::CredentialError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

pub const GITHUB_PROVIDER: &str = "github";

/// Looks up the bearer token a user has connected for a provider
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn get_token(&self, owner: &str, provider: &str) -> Result<String, CredentialError>;
}

/// Tokens keyed by (owner, provider)
#[derive(Default)]
pub struct InMemoryCredentials {
    tokens: RwLock<HashMap<(String, String), String>>,
}

impl InMemoryCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self, owner: &str, provider: &str, token: impl Into<String>) {
        let mut tokens = self.tokens.write().await;
        tokens.insert((owner.to_string(), provider.to_string()), token.into());
        debug!("Stored {} credential for {}", provider, owner);
    }

    pub async fn disconnect(&self, owner: &str, provider: &str) -> bool {
        let mut tokens = self.tokens.write().await;
        tokens
            .remove(&(owner.to_string(), provider.to_string()))
            .is_some()
    }
}

#[async_trait]
impl CredentialProvider for InMemoryCredentials {
    async fn get_token(&self, owner: &str, provider: &str) -> Result<String, CredentialError> {
        let tokens = self.tokens.read().await;
        tokens
            .get(&(owner.to_string(), provider.to_string()))
            .cloned()
            .ok_or_else(|| CredentialError::not_connected(provider))
    }
}

/// Serves one GitHub token (from `GITHUB_TOKEN`) to every owner
pub struct EnvCredentials {
    github_token: Option<String>,
}

impl EnvCredentials {
    pub fn new(github_token: Option<String>) -> Self {
        Self { github_token }
    }
}

#[async_trait]
impl CredentialProvider for EnvCredentials {
    async fn get_token(&self, _owner: &str, provider: &str) -> Result<String, CredentialError> {
        match (provider, &self.github_token) {
            (GITHUB_PROVIDER, Some(token)) => Ok(token.clone()),
            _ => Err(CredentialError::not_connected(provider)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_connect_and_disconnect() {
        let store = InMemoryCredentials::new();
        store.connect("42", GITHUB_PROVIDER, "ghp_abc").await;

        assert_eq!(store.get_token("42", "github").await.unwrap(), "ghp_abc");
        assert_eq!(
            store.get_token("7", "github").await.unwrap_err(),
            CredentialError::not_connected("github")
        );

        assert!(store.disconnect("42", "github").await);
        let err = store.get_token("42", "github").await.unwrap_err();
        assert_eq!(err.to_string(), "No connection found for github");
    }

    #[tokio::test]
    async fn test_env_credentials() {
        let env = EnvCredentials::new(Some("ghp_env".to_string()));
        assert_eq!(env.get_token("anyone", "github").await.unwrap(), "ghp_env");
        assert!(env.get_token("anyone", "figma").await.is_err());

        let empty = EnvCredentials::new(None);
        assert!(matches!(
            empty.get_token("anyone", "github").await,
            Err(CredentialError::NotConnected { .. })
        ));
    }
}
