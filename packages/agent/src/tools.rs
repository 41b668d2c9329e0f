// ABOUTME: Typed tool surface exposed to the model: names, argument structs and JSON schemas
// ABOUTME: Raw tool calls are parsed into `ToolInvocation` so missing arguments fail before dispatch

use crate::error::ToolError;
use sandcraft_ai::ToolDefinition;
use sandcraft_sandbox::SUPPORTED_IMAGES;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_COMMIT_MESSAGE: &str = "Initial commit from AI sandbox";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    CreateRepo,
    ListRepos,
    CreateIssue,
    ListIssues,
    GetFileContent,
    CreateFile,
    SetupDevEnvironment,
    RunTerminalCommand,
    WriteSandboxFile,
    ReadSandboxFile,
    ListSandboxFiles,
    DestroySandbox,
    PushSandboxToGitHub,
}

impl ToolName {
    pub const ALL: [ToolName; 13] = [
        ToolName::CreateRepo,
        ToolName::ListRepos,
        ToolName::CreateIssue,
        ToolName::ListIssues,
        ToolName::GetFileContent,
        ToolName::CreateFile,
        ToolName::SetupDevEnvironment,
        ToolName::RunTerminalCommand,
        ToolName::WriteSandboxFile,
        ToolName::ReadSandboxFile,
        ToolName::ListSandboxFiles,
        ToolName::DestroySandbox,
        ToolName::PushSandboxToGitHub,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::CreateRepo => "create_repo",
            ToolName::ListRepos => "list_repos",
            ToolName::CreateIssue => "create_issue",
            ToolName::ListIssues => "list_issues",
            ToolName::GetFileContent => "get_file_content",
            ToolName::CreateFile => "create_file",
            ToolName::SetupDevEnvironment => "setup_dev_environment",
            ToolName::RunTerminalCommand => "run_terminal_command",
            ToolName::WriteSandboxFile => "write_sandbox_file",
            ToolName::ReadSandboxFile => "read_sandbox_file",
            ToolName::ListSandboxFiles => "list_sandbox_files",
            ToolName::DestroySandbox => "destroy_sandbox",
            ToolName::PushSandboxToGitHub => "push_sandbox_to_github",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

// Request types for the tools

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateRepoArgs {
    pub name: String,
    #[serde(default)]
    pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateIssueArgs {
    pub repo_name: String,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepoArgs {
    pub repo_name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RepoFileArgs {
    pub repo_name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateFileArgs {
    pub repo_name: String,
    pub path: String,
    pub content: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl CreateFileArgs {
    pub fn commit_message(&self) -> String {
        self.message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("Add {}", self.path))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SetupDevEnvironmentArgs {
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RunCommandArgs {
    pub container_id: String,
    pub command: String,
    #[serde(default)]
    pub background: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WriteFileArgs {
    pub container_id: String,
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SandboxFileArgs {
    pub container_id: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListFilesArgs {
    pub container_id: String,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ContainerArgs {
    pub container_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PushArgs {
    pub container_id: String,
    pub repo_name: String,
    #[serde(default)]
    pub commit_message: Option<String>,
    #[serde(default)]
    pub private: bool,
}

impl PushArgs {
    pub fn commit_message(&self) -> &str {
        self.commit_message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_COMMIT_MESSAGE)
    }
}

/// A tool call with its arguments validated
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    CreateRepo(CreateRepoArgs),
    ListRepos,
    CreateIssue(CreateIssueArgs),
    ListIssues(RepoArgs),
    GetFileContent(RepoFileArgs),
    CreateFile(CreateFileArgs),
    SetupDevEnvironment(SetupDevEnvironmentArgs),
    RunTerminalCommand(RunCommandArgs),
    WriteSandboxFile(WriteFileArgs),
    ReadSandboxFile(SandboxFileArgs),
    ListSandboxFiles(ListFilesArgs),
    DestroySandbox(ContainerArgs),
    PushSandboxToGitHub(PushArgs),
}

impl ToolInvocation {
    /// Parse a tool call as emitted by the model. `arguments` is the raw JSON string.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, ToolError> {
        let tool: ToolName = name.parse()?;
        let value = parse_arguments(arguments).map_err(|e| ToolError::InvalidArguments {
            tool: tool.to_string(),
            message: e.to_string(),
        })?;
        Self::from_value(tool, value)
    }

    pub fn from_value(tool: ToolName, args: Value) -> Result<Self, ToolError> {
        let invocation = match tool {
            ToolName::CreateRepo => ToolInvocation::CreateRepo(args_for(tool, args)?),
            ToolName::ListRepos => ToolInvocation::ListRepos,
            ToolName::CreateIssue => ToolInvocation::CreateIssue(args_for(tool, args)?),
            ToolName::ListIssues => ToolInvocation::ListIssues(args_for(tool, args)?),
            ToolName::GetFileContent => ToolInvocation::GetFileContent(args_for(tool, args)?),
            ToolName::CreateFile => ToolInvocation::CreateFile(args_for(tool, args)?),
            ToolName::SetupDevEnvironment => {
                ToolInvocation::SetupDevEnvironment(args_for(tool, args)?)
            }
            ToolName::RunTerminalCommand => {
                ToolInvocation::RunTerminalCommand(args_for(tool, args)?)
            }
            ToolName::WriteSandboxFile => ToolInvocation::WriteSandboxFile(args_for(tool, args)?),
            ToolName::ReadSandboxFile => ToolInvocation::ReadSandboxFile(args_for(tool, args)?),
            ToolName::ListSandboxFiles => ToolInvocation::ListSandboxFiles(args_for(tool, args)?),
            ToolName::DestroySandbox => ToolInvocation::DestroySandbox(args_for(tool, args)?),
            ToolName::PushSandboxToGitHub => {
                ToolInvocation::PushSandboxToGitHub(args_for(tool, args)?)
            }
        };
        Ok(invocation)
    }
}

/// Empty or whitespace-only argument strings count as `{}`
pub fn parse_arguments(arguments: &str) -> serde_json::Result<Value> {
    if arguments.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(arguments)
}

fn args_for<T: DeserializeOwned>(tool: ToolName, args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(Map::new())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn tool(name: ToolName, description: &str, properties: Value, required: &[&str]) -> ToolDefinition {
    ToolDefinition::function(
        name.as_str(),
        description,
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    )
}

fn string_prop(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

fn bool_prop(description: &str) -> Value {
    json!({"type": "boolean", "description": description})
}

/// Schemas for every tool, in `ToolName::ALL` order
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let container_id = string_prop("The ID of the sandbox container");

    vec![
        tool(
            ToolName::CreateRepo,
            "Create a new GitHub repository for the user",
            json!({
                "name": string_prop("The name of the repository to create"),
                "private": bool_prop("Whether the repository should be private. Defaults to false (public)."),
            }),
            &["name"],
        ),
        tool(
            ToolName::ListRepos,
            "List all GitHub repositories for the user",
            json!({}),
            &[],
        ),
        tool(
            ToolName::CreateIssue,
            "Create a new issue in a GitHub repository",
            json!({
                "repo_name": string_prop("The name of the repository (e.g., 'my-repo' or 'owner/my-repo')"),
                "title": string_prop("The title of the issue"),
                "body": string_prop("The body/description of the issue"),
            }),
            &["repo_name", "title", "body"],
        ),
        tool(
            ToolName::ListIssues,
            "List all issues in a GitHub repository",
            json!({"repo_name": string_prop("The name of the repository")}),
            &["repo_name"],
        ),
        tool(
            ToolName::GetFileContent,
            "Get the content of a file from a GitHub repository",
            json!({
                "repo_name": string_prop("The name of the repository"),
                "path": string_prop("The file path within the repository (e.g., 'README.md' or 'src/main.py')"),
            }),
            &["repo_name", "path"],
        ),
        tool(
            ToolName::CreateFile,
            "Create or update a file in a GitHub repository",
            json!({
                "repo_name": string_prop("The name of the repository"),
                "path": string_prop("The file path within the repository (e.g., 'README.md' or '.gitignore')"),
                "content": string_prop("The content of the file to create"),
                "message": string_prop("The commit message. Defaults to 'Add <path>'."),
            }),
            &["repo_name", "path", "content"],
        ),
        tool(
            ToolName::SetupDevEnvironment,
            "Set up a new development sandbox for running code. The sandbox has resource limits and is cleaned up automatically after 30 minutes.",
            json!({
                "image": {
                    "type": "string",
                    "description": "The image to use (e.g., 'node:18' or 'python:3.11')",
                    "enum": SUPPORTED_IMAGES,
                },
            }),
            &["image"],
        ),
        tool(
            ToolName::RunTerminalCommand,
            "Run a shell command in the sandbox",
            json!({
                "container_id": container_id.clone(),
                "command": string_prop("The shell command to execute"),
                "background": bool_prop("Whether to run in the background (for servers). Defaults to false."),
            }),
            &["container_id", "command"],
        ),
        tool(
            ToolName::WriteSandboxFile,
            "Write a file in the sandbox",
            json!({
                "container_id": container_id.clone(),
                "path": string_prop("The file path, relative to /app unless absolute"),
                "content": string_prop("The content of the file"),
            }),
            &["container_id", "path", "content"],
        ),
        tool(
            ToolName::ReadSandboxFile,
            "Read a file from the sandbox",
            json!({
                "container_id": container_id.clone(),
                "path": string_prop("The file path, relative to /app unless absolute"),
            }),
            &["container_id", "path"],
        ),
        tool(
            ToolName::ListSandboxFiles,
            "List files in the sandbox",
            json!({
                "container_id": container_id.clone(),
                "path": string_prop("The directory to list (defaults to /app)"),
            }),
            &["container_id"],
        ),
        tool(
            ToolName::DestroySandbox,
            "Destroy a sandbox and free its resources. Call this once the task is complete.",
            json!({"container_id": string_prop("The ID of the sandbox container to destroy")}),
            &["container_id"],
        ),
        tool(
            ToolName::PushSandboxToGitHub,
            "Push the sandbox code to a GitHub repository, creating the repository if it does not exist",
            json!({
                "container_id": container_id.clone(),
                "repo_name": string_prop("The name for the GitHub repository"),
                "commit_message": string_prop("The commit message for this push"),
                "private": bool_prop("Whether the repository should be private. Defaults to false."),
            }),
            &["container_id", "repo_name"],
        ),
    ]
}
