// ABOUTME: Command executor for running shell commands inside running sandboxes
// ABOUTME: Foreground runs capture merged output and exit code; background runs are fire-and-forget

use crate::error::{Result, SandboxError};
use crate::runtime::{ContainerRuntime, ExecRequest};
use crate::settings::SandboxSettings;
use crate::types::CommandOutput;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub const BACKGROUND_STARTED_MESSAGE: &str = "Command started in background";

/// Request to run one shell command in a sandbox
#[derive(Debug, Clone)]
pub struct ExecuteCommandRequest {
    pub sandbox_id: String,
    pub command: String,
    pub working_dir: Option<String>,
    pub background: bool,
    pub env: HashMap<String, String>,
}

impl ExecuteCommandRequest {
    pub fn new(sandbox_id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            sandbox_id: sandbox_id.into(),
            command: command.into(),
            working_dir: None,
            background: false,
            env: HashMap::new(),
        }
    }

    pub fn background(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    pub fn working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

#[derive(Clone)]
pub struct CommandExecutor {
    runtime: Arc<dyn ContainerRuntime>,
    settings: Arc<SandboxSettings>,
}

impl CommandExecutor {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, settings: Arc<SandboxSettings>) -> Self {
        Self { runtime, settings }
    }

    /// Run a command under `sh -c`.
    ///
    /// A nonzero exit code is a normal result, not an error. Background
    /// commands return immediately with a placeholder; their output and exit
    /// code are not observable afterwards.
    pub async fn execute(&self, request: ExecuteCommandRequest) -> Result<CommandOutput> {
        let working_dir = request
            .working_dir
            .clone()
            .unwrap_or_else(|| self.settings.working_dir.clone());

        let exec = ExecRequest::shell(&request.command)
            .working_dir(working_dir)
            .env(request.env);

        if request.background {
            info!(
                "Starting background command in {}: {}",
                request.sandbox_id,
                redact_credentials(&request.command)
            );
            let exec_id = self
                .runtime
                .exec_detached(&request.sandbox_id, &exec)
                .await
                .map_err(|e| SandboxError::for_container(e, &request.sandbox_id))?;
            debug!("Background exec id for {}: {}", request.sandbox_id, exec_id);

            return Ok(CommandOutput {
                output: BACKGROUND_STARTED_MESSAGE.to_string(),
                exit_code: 0,
            });
        }

        info!(
            "Executing in {}: {}",
            request.sandbox_id,
            redact_credentials(&request.command)
        );
        let result = self
            .runtime
            .exec(&request.sandbox_id, &exec)
            .await
            .map_err(|e| SandboxError::for_container(e, &request.sandbox_id))?;

        debug!(
            "Command in {} exited with {}",
            request.sandbox_id, result.exit_code
        );

        Ok(CommandOutput {
            output: String::from_utf8_lossy(&result.output).to_string(),
            exit_code: result.exit_code,
        })
    }

    /// Run a command given as argv, without a shell, in the default directory
    pub(crate) async fn run_argv(&self, sandbox_id: &str, argv: &[&str]) -> Result<CommandOutput> {
        let exec = ExecRequest::new(argv.iter().copied()).working_dir(&self.settings.working_dir);
        let result = self
            .runtime
            .exec(sandbox_id, &exec)
            .await
            .map_err(|e| SandboxError::for_container(e, sandbox_id))?;

        Ok(CommandOutput {
            output: String::from_utf8_lossy(&result.output).to_string(),
            exit_code: result.exit_code,
        })
    }
}

/// Mask `user:secret@` userinfo in URLs so command lines can be logged
pub fn redact_credentials(command: &str) -> String {
    let mut out = String::with_capacity(command.len());
    let mut rest = command;

    while let Some(scheme_end) = rest.find("://") {
        let (head, tail) = rest.split_at(scheme_end + 3);
        out.push_str(head);

        let authority_end = tail
            .find(|c: char| c == '/' || c.is_whitespace())
            .unwrap_or(tail.len());
        let authority = &tail[..authority_end];
        match (authority.rfind('@'), authority.find(':')) {
            (Some(at), Some(colon)) if colon < at => {
                out.push_str(&authority[..colon]);
                out.push_str(":***");
                out.push_str(&authority[at..]);
            }
            _ => out.push_str(authority),
        }
        rest = &tail[authority_end..];
    }

    out.push_str(rest);
    out
}
