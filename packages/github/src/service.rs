// ABOUTME: User-scoped GitHub service resolving tokens through the credential provider
// ABOUTME: Accepts `owner/repo` or a bare repo name resolved against the authenticated login

use crate::client::GitHubClient;
use crate::credentials::{CredentialProvider, GITHUB_PROVIDER};
use crate::error::Result;
use crate::types::{CreatedFile, FileContent, GitHubUser, Issue, Repository};
use std::sync::Arc;

#[derive(Clone)]
pub struct GitHubService {
    credentials: Arc<dyn CredentialProvider>,
    api_url: String,
}

impl GitHubService {
    pub fn new(credentials: Arc<dyn CredentialProvider>, api_url: impl Into<String>) -> Self {
        Self {
            credentials,
            api_url: api_url.into(),
        }
    }

    pub async fn get_token(&self, owner: &str) -> Result<String> {
        Ok(self.credentials.get_token(owner, GITHUB_PROVIDER).await?)
    }

    /// Client authenticated as `owner`
    pub async fn client_for(&self, owner: &str) -> Result<GitHubClient> {
        let token = self.get_token(owner).await?;
        GitHubClient::new(&self.api_url, token)
    }

    pub async fn get_user(&self, owner: &str) -> Result<GitHubUser> {
        self.client_for(owner).await?.get_user().await
    }

    pub async fn create_repo(&self, owner: &str, name: &str, private: bool) -> Result<Repository> {
        self.client_for(owner).await?.create_repo(name, private).await
    }

    pub async fn list_repos(&self, owner: &str) -> Result<Vec<Repository>> {
        self.client_for(owner).await?.list_repos().await
    }

    pub async fn create_issue(
        &self,
        owner: &str,
        repo_name: &str,
        title: &str,
        body: &str,
    ) -> Result<Issue> {
        let client = self.client_for(owner).await?;
        let (repo_owner, repo) = resolve_repo(&client, repo_name).await?;
        client.create_issue(&repo_owner, &repo, title, body).await
    }

    pub async fn list_issues(&self, owner: &str, repo_name: &str) -> Result<Vec<Issue>> {
        let client = self.client_for(owner).await?;
        let (repo_owner, repo) = resolve_repo(&client, repo_name).await?;
        client.list_issues(&repo_owner, &repo).await
    }

    pub async fn get_file_content(
        &self,
        owner: &str,
        repo_name: &str,
        path: &str,
    ) -> Result<FileContent> {
        let client = self.client_for(owner).await?;
        let (repo_owner, repo) = resolve_repo(&client, repo_name).await?;
        client.get_file_content(&repo_owner, &repo, path).await
    }

    pub async fn create_file(
        &self,
        owner: &str,
        repo_name: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<CreatedFile> {
        let client = self.client_for(owner).await?;
        let (repo_owner, repo) = resolve_repo(&client, repo_name).await?;
        client
            .create_file(&repo_owner, &repo, path, content, message)
            .await
    }
}

/// Split `owner/repo`, or pair a bare name with the authenticated user's login
async fn resolve_repo(client: &GitHubClient, repo_name: &str) -> Result<(String, String)> {
    if let Some((owner, repo)) = repo_name.split_once('/') {
        return Ok((owner.to_string(), repo.to_string()));
    }
    let user = client.get_user().await?;
    Ok((user.login, repo_name.to_string()))
}
