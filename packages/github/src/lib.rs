// ABOUTME: GitHub integration for Sandcraft agents
// ABOUTME: Credential provider seam, REST client and a user-scoped service over both

pub mod client;
pub mod credentials;
pub mod error;
pub mod service;
pub mod types;

pub use client::{GitHubClient, DEFAULT_API_URL};
pub use credentials::{CredentialProvider, EnvCredentials, InMemoryCredentials, GITHUB_PROVIDER};
pub use error::{CredentialError, GitHubError, Result};
pub use service::GitHubService;
pub use types::{CreatedFile, FileContent, GitHubUser, Issue, Repository};
