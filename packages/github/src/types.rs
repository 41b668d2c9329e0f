// ABOUTME: GitHub REST request and response models
// ABOUTME: Only the fields the agent tools read are modelled; unknown fields are ignored

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub private: bool,
    pub html_url: String,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GitHubUser {
    pub login: String,
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub html_url: String,
    #[serde(default)]
    pub body: Option<String>,
}

/// File from the contents API with its content already decoded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    pub sha: String,
    pub size: u64,
    pub html_url: Option<String>,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawContent {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitRef {
    pub sha: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentRef {
    pub name: String,
    pub path: String,
    pub sha: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Response of a contents PUT
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedFile {
    pub content: ContentRef,
    pub commit: CommitRef,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateRepoRequest<'a> {
    pub name: &'a str,
    pub private: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateIssueRequest<'a> {
    pub title: &'a str,
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct CreateFileRequest<'a> {
    pub message: &'a str,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub message: String,
}
