// ABOUTME: Authenticated GitHub REST client
// ABOUTME: One HTTP call per operation; non-2xx responses carry the upstream message

use crate::error::{GitHubError, Result};
use crate::types::{
    ApiErrorBody, CreateFileRequest, CreateIssueRequest, CreateRepoRequest, CreatedFile,
    FileContent, GitHubUser, Issue, RawContent, Repository,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("sandcraft/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct GitHubClient {
    http_client: Client,
    base_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.message)
                .unwrap_or(text);
            warn!("GitHub API returned {}: {}", status, message);
            return Err(GitHubError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| GitHubError::ParseError(e.to_string()))
    }

    pub async fn create_repo(&self, name: &str, private: bool) -> Result<Repository> {
        debug!("Creating repository {} (private: {})", name, private);
        let response = self
            .authed(self.http_client.post(self.url("/user/repos")))
            .json(&CreateRepoRequest { name, private })
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn list_repos(&self) -> Result<Vec<Repository>> {
        let response = self
            .authed(self.http_client.get(self.url("/user/repos")))
            .query(&[("sort", "updated"), ("per_page", "100")])
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn get_user(&self) -> Result<GitHubUser> {
        let response = self
            .authed(self.http_client.get(self.url("/user")))
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        title: &str,
        body: &str,
    ) -> Result<Issue> {
        debug!("Creating issue in {}/{}", owner, repo);
        let response = self
            .authed(
                self.http_client
                    .post(self.url(&format!("/repos/{}/{}/issues", owner, repo))),
            )
            .json(&CreateIssueRequest { title, body })
            .send()
            .await?;
        Self::parse(response).await
    }

    pub async fn list_issues(&self, owner: &str, repo: &str) -> Result<Vec<Issue>> {
        let response = self
            .authed(
                self.http_client
                    .get(self.url(&format!("/repos/{}/{}/issues", owner, repo))),
            )
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Fetch a file and decode its base64 body as text
    pub async fn get_file_content(&self, owner: &str, repo: &str, path: &str) -> Result<FileContent> {
        let response = self
            .authed(self.http_client.get(self.url(&format!(
                "/repos/{}/{}/contents/{}",
                owner,
                repo,
                path.trim_start_matches('/')
            ))))
            .send()
            .await?;
        let raw: RawContent = Self::parse(response).await?;

        let content = match (raw.content.as_deref(), raw.encoding.as_deref()) {
            (Some(encoded), Some("base64")) => {
                let compact: String = encoded.split_whitespace().collect();
                let bytes = STANDARD
                    .decode(compact)
                    .map_err(|e| GitHubError::ParseError(format!("Invalid base64 content: {}", e)))?;
                String::from_utf8_lossy(&bytes).to_string()
            }
            (Some(plain), _) => plain.to_string(),
            (None, _) => String::new(),
        };

        Ok(FileContent {
            name: raw.name,
            path: raw.path,
            sha: raw.sha,
            size: raw.size,
            html_url: raw.html_url,
            content,
        })
    }

    /// Create a file via the contents API; the body is base64-encoded before sending
    pub async fn create_file(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<CreatedFile> {
        debug!("Creating {} in {}/{}", path, owner, repo);
        let response = self
            .authed(self.http_client.put(self.url(&format!(
                "/repos/{}/{}/contents/{}",
                owner,
                repo,
                path.trim_start_matches('/')
            ))))
            .json(&CreateFileRequest {
                message,
                content: STANDARD.encode(content.as_bytes()),
            })
            .send()
            .await?;
        Self::parse(response).await
    }
}
