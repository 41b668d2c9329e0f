// ABOUTME: Application context assembled from `Config`
// ABOUTME: One Docker-backed orchestrator and one GitHub service shared by every command

use anyhow::{Context, Result};
use sandcraft_agent::{AgentService, ToolExecutor};
use sandcraft_ai::AIService;
use sandcraft_config::Config;
use sandcraft_github::{EnvCredentials, GitHubService};
use sandcraft_sandbox::{ContainerRuntime, DockerRuntime, SandboxOrchestrator, SandboxSettings};
use std::sync::Arc;
use tracing::info;

/// Sandbox settings with the configurable caps and paths applied over the defaults
pub fn sandbox_settings(config: &Config) -> SandboxSettings {
    SandboxSettings {
        data_dir: config.sandbox_data_dir.clone(),
        memory_mb: config.sandbox_memory_mb,
        cpu_quota: config.sandbox_cpu_quota,
        cpu_period: config.sandbox_cpu_period,
        cleanup_timeout: config.sandbox_timeout,
        ..Default::default()
    }
}

pub struct AppContext {
    pub config: Config,
    pub orchestrator: SandboxOrchestrator,
    pub github: GitHubService,
}

impl AppContext {
    /// Connect to the local Docker daemon
    pub fn from_config(config: Config) -> Result<Self> {
        let runtime = DockerRuntime::new().context("Failed to connect to Docker")?;
        Ok(Self::with_runtime(config, Arc::new(runtime)))
    }

    pub fn with_runtime(config: Config, runtime: Arc<dyn ContainerRuntime>) -> Self {
        let orchestrator = SandboxOrchestrator::new(runtime, sandbox_settings(&config));
        let credentials = Arc::new(EnvCredentials::new(config.github_token.clone()));
        let github = GitHubService::new(credentials, config.github_api_url.clone());

        Self {
            config,
            orchestrator,
            github,
        }
    }

    pub fn agent(&self) -> Result<AgentService> {
        let client = AIService::new(self.config.openai_api_key.clone())
            .context("Failed to create completion client")?
            .with_model(self.config.model.clone())
            .with_completions_url(self.config.completions_url.clone());
        info!("Agent using model {}", client.model());

        let executor = ToolExecutor::new(self.orchestrator.clone(), self.github.clone());
        Ok(AgentService::new(Arc::new(client), Arc::new(executor))
            .with_max_tool_rounds(self.config.max_tool_rounds))
    }
}
