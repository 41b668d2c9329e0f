// ABOUTME: Tool dispatch executor routing model tool calls to their handlers
// ABOUTME: Always returns a JSON value; failures become `{"error": ...}` results

use crate::error::ToolError;
use crate::handlers::{GitHubToolHandler, SandboxToolHandler};
use crate::tools::{tool_definitions, ToolInvocation};
use sandcraft_ai::ToolDefinition;
use sandcraft_github::GitHubService;
use sandcraft_sandbox::SandboxOrchestrator;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

pub struct ToolExecutor {
    github: GitHubToolHandler,
    sandbox: SandboxToolHandler,
    definitions: Vec<ToolDefinition>,
}

impl ToolExecutor {
    pub fn new(orchestrator: SandboxOrchestrator, github: GitHubService) -> Self {
        let github = GitHubToolHandler::new(github);
        Self {
            sandbox: SandboxToolHandler::new(orchestrator, github.clone()),
            github,
            definitions: tool_definitions(),
        }
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    pub fn sandbox_handler(&self) -> &SandboxToolHandler {
        &self.sandbox
    }

    /// Run one tool call on behalf of `owner`. Never fails.
    pub async fn execute(&self, owner: &str, name: &str, arguments: &str) -> Value {
        info!("Dispatching tool {} for {}", name, owner);

        let result = match ToolInvocation::parse(name, arguments) {
            Ok(invocation) => self.dispatch(owner, invocation).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(value) => {
                debug!("Tool {} for {} succeeded", name, owner);
                value
            }
            Err(e) => {
                warn!("Tool {} for {} failed: {}", name, owner, e);
                json!({ "error": e.to_tool_message() })
            }
        }
    }

    pub async fn dispatch(&self, owner: &str, invocation: ToolInvocation) -> Result<Value, ToolError> {
        match invocation {
            ToolInvocation::CreateRepo(args) => self.github.create_repo(owner, &args).await,
            ToolInvocation::ListRepos => self.github.list_repos(owner).await,
            ToolInvocation::CreateIssue(args) => self.github.create_issue(owner, &args).await,
            ToolInvocation::ListIssues(args) => self.github.list_issues(owner, &args).await,
            ToolInvocation::GetFileContent(args) => {
                self.github.get_file_content(owner, &args).await
            }
            ToolInvocation::CreateFile(args) => self.github.create_file(owner, &args).await,
            ToolInvocation::SetupDevEnvironment(args) => {
                self.sandbox.setup_dev_environment(owner, &args).await
            }
            ToolInvocation::RunTerminalCommand(args) => self.sandbox.run_command(owner, &args).await,
            ToolInvocation::WriteSandboxFile(args) => self.sandbox.write_file(owner, &args).await,
            ToolInvocation::ReadSandboxFile(args) => self.sandbox.read_file(owner, &args).await,
            ToolInvocation::ListSandboxFiles(args) => self.sandbox.list_files(owner, &args).await,
            ToolInvocation::DestroySandbox(args) => {
                self.sandbox.destroy_sandbox(owner, &args).await
            }
            ToolInvocation::PushSandboxToGitHub(args) => {
                self.sandbox.push_to_github(owner, &args).await
            }
        }
    }
}
