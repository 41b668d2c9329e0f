// ABOUTME: GitHub tool handlers delegating to the user-scoped GitHub service
// ABOUTME: Listing results are reduced to the fields the model needs

use crate::error::ToolError;
use crate::tools::{CreateFileArgs, CreateIssueArgs, CreateRepoArgs, RepoArgs, RepoFileArgs};
use sandcraft_github::{GitHubService, Issue, Repository};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoSummary {
    pub name: String,
    pub full_name: String,
    pub private: bool,
    pub url: String,
}

impl From<Repository> for RepoSummary {
    fn from(repo: Repository) -> Self {
        Self {
            name: repo.name,
            full_name: repo.full_name,
            private: repo.private,
            url: repo.html_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueSummary {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub url: String,
}

impl From<Issue> for IssueSummary {
    fn from(issue: Issue) -> Self {
        Self {
            number: issue.number,
            title: issue.title,
            state: issue.state,
            url: issue.html_url,
        }
    }
}

#[derive(Clone)]
pub struct GitHubToolHandler {
    service: GitHubService,
}

impl GitHubToolHandler {
    pub fn new(service: GitHubService) -> Self {
        Self { service }
    }

    pub async fn create_repo(&self, owner: &str, args: &CreateRepoArgs) -> Result<Value, ToolError> {
        let repo = self
            .service
            .create_repo(owner, &args.name, args.private)
            .await?;
        Ok(serde_json::to_value(repo)?)
    }

    pub async fn list_repos(&self, owner: &str) -> Result<Value, ToolError> {
        let repos: Vec<RepoSummary> = self
            .service
            .list_repos(owner)
            .await?
            .into_iter()
            .map(RepoSummary::from)
            .collect();
        Ok(serde_json::to_value(repos)?)
    }

    pub async fn create_issue(
        &self,
        owner: &str,
        args: &CreateIssueArgs,
    ) -> Result<Value, ToolError> {
        let issue = self
            .service
            .create_issue(owner, &args.repo_name, &args.title, &args.body)
            .await?;
        Ok(serde_json::to_value(issue)?)
    }

    pub async fn list_issues(&self, owner: &str, args: &RepoArgs) -> Result<Value, ToolError> {
        let issues: Vec<IssueSummary> = self
            .service
            .list_issues(owner, &args.repo_name)
            .await?
            .into_iter()
            .map(IssueSummary::from)
            .collect();
        Ok(serde_json::to_value(issues)?)
    }

    pub async fn get_file_content(
        &self,
        owner: &str,
        args: &RepoFileArgs,
    ) -> Result<Value, ToolError> {
        let file = self
            .service
            .get_file_content(owner, &args.repo_name, &args.path)
            .await?;
        Ok(serde_json::to_value(file)?)
    }

    pub async fn create_file(&self, owner: &str, args: &CreateFileArgs) -> Result<Value, ToolError> {
        let created = self
            .service
            .create_file(
                owner,
                &args.repo_name,
                &args.path,
                &args.content,
                &args.commit_message(),
            )
            .await?;
        Ok(serde_json::to_value(created)?)
    }

    pub async fn get_token(&self, owner: &str) -> Result<String, ToolError> {
        Ok(self.service.get_token(owner).await?)
    }

    /// Login of the account the owner connected
    pub async fn get_login(&self, owner: &str) -> Result<String, ToolError> {
        Ok(self.service.get_user(owner).await?.login)
    }

    /// Create a repository, treating any failure as "it probably exists already"
    /// Create the repository unless GitHub reports that it already exists
    pub async fn ensure_repo(&self, owner: &str, name: &str, private: bool) -> Result<(), ToolError> {
        match self.service.create_repo(owner, name, private).await {
            Ok(repo) => {
                info!("Created repository {}", repo.full_name);
                Ok(())
            }
            Err(e) if e.is_unprocessable() => {
                debug!("Repository {} already exists: {}", name, e);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_repo_summary_keeps_only_listing_fields() {
        let summary = RepoSummary::from(Repository {
            name: "demo".to_string(),
            full_name: "octocat/demo".to_string(),
            private: true,
            html_url: "https://github.com/octocat/demo".to_string(),
            clone_url: Some("https://github.com/octocat/demo.git".to_string()),
            description: Some("a demo".to_string()),
        });

        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            serde_json::json!({
                "name": "demo",
                "full_name": "octocat/demo",
                "private": true,
                "url": "https://github.com/octocat/demo"
            })
        );
    }
}
