// ABOUTME: Error types for the GitHub client and credential providers
// ABOUTME: Separates missing connections from upstream API failures and transport errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CredentialError {
    #[error("No connection found for {provider}")]
    NotConnected { provider: String },
}

impl CredentialError {
    pub fn not_connected(provider: impl Into<String>) -> Self {
        Self::NotConnected {
            provider: provider.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("Failed to parse GitHub response: {0}")]
    ParseError(String),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl GitHubError {
    /// GitHub answers 422 when a repository with that name already exists
    pub fn is_unprocessable(&self) -> bool {
        matches!(self, GitHubError::Api { status: 422, .. })
    }
}

pub type Result<T> = std::result::Result<T, GitHubError>;
