// ABOUTME: Tool handlers grouped by the service they drive
// ABOUTME: GitHub operations and sandbox operations including the push composition

pub mod github;
pub mod sandbox;

pub use github::{GitHubToolHandler, IssueSummary, RepoSummary};
pub use sandbox::SandboxToolHandler;
