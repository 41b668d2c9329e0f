// ABOUTME: Error types for tool dispatch and the conversation loop
// ABOUTME: Tool errors never leave the dispatcher; agent errors end a turn

use sandcraft_ai::AIServiceError;
use sandcraft_github::{CredentialError, GitHubError};
use sandcraft_sandbox::SandboxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    GitHub(GitHubError),

    #[error(transparent)]
    Sandbox(#[from] SandboxError),

    #[error("Failed to encode tool result: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<GitHubError> for ToolError {
    fn from(err: GitHubError) -> Self {
        match err {
            GitHubError::Credential(e) => ToolError::Credential(e),
            other => ToolError::GitHub(other),
        }
    }
}

impl ToolError {
    /// Errors the model can act on directly; their message is passed through unwrapped
    pub fn is_domain(&self) -> bool {
        match self {
            ToolError::UnknownTool(_)
            | ToolError::InvalidArguments { .. }
            | ToolError::Credential(_) => true,
            ToolError::Sandbox(e) => matches!(
                e,
                SandboxError::UnsupportedImage { .. }
                    | SandboxError::NotFound(_)
                    | SandboxError::FileNotFound(_)
                    | SandboxError::ListFailed(_)
            ),
            ToolError::GitHub(_) | ToolError::Encode(_) => false,
        }
    }

    /// Message fed back into the conversation as `{"error": ...}`
    pub fn to_tool_message(&self) -> String {
        if self.is_domain() {
            self.to_string()
        } else {
            format!("Tool execution failed: {}", self)
        }
    }
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Completion failed: {0}")]
    Completion(#[from] AIServiceError),

    #[error("Model still requested tools after {0} tool rounds")]
    MaxRoundsExceeded(usize),

    #[error("Tool task failed: {0}")]
    ToolTask(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_errors_pass_through() {
        let err: ToolError = GitHubError::Credential(CredentialError::not_connected("github")).into();
        assert!(matches!(err, ToolError::Credential(_)));
        assert_eq!(err.to_tool_message(), "No connection found for github");
    }

    #[test]
    fn test_infrastructure_errors_are_wrapped() {
        let err: ToolError = GitHubError::Api {
            status: 500,
            message: "boom".to_string(),
        }
        .into();
        assert!(err.to_tool_message().starts_with("Tool execution failed: "));
        assert!(err.to_tool_message().contains("boom"));
    }

    #[test]
    fn test_list_failure_keeps_its_message() {
        let err = ToolError::Sandbox(SandboxError::ListFailed("no such dir".to_string()));
        assert_eq!(err.to_tool_message(), "Failed to list files: no such dir");
    }
}
