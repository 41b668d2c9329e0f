// ABOUTME: Container runtime trait and shared types for sandbox backends
// ABOUTME: Exposes the create/exec/archive/stop/remove/list primitives the orchestrator composes

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

pub mod docker;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use docker::DockerRuntime;
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryRuntime;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Container error: {0}")]
    Container(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Exec error: {0}")]
    Exec(String),

    #[error("Archive error: {0}")]
    Archive(String),
}

impl RuntimeError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RuntimeError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Everything needed to start one sandbox container
#[derive(Debug, Clone)]
pub struct ContainerSpec {
    pub image: String,
    pub command: Vec<String>,
    pub working_dir: String,
    pub binds: Vec<VolumeMount>,
    /// Container port published on a runtime-assigned host port
    pub exposed_port: u16,
    pub memory_bytes: i64,
    pub cpu_quota: i64,
    pub cpu_period: i64,
    pub labels: HashMap<String, String>,
    pub network_mode: String,
}

#[derive(Debug, Clone)]
pub struct VolumeMount {
    pub host_path: String,
    pub container_path: String,
    pub readonly: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Removing,
    Stopped,
    Dead,
    Unknown(String),
}

impl ContainerStatus {
    pub fn from_state(state: &str) -> Self {
        match state.to_lowercase().as_str() {
            "created" => ContainerStatus::Created,
            "running" | "restarting" => ContainerStatus::Running,
            "paused" => ContainerStatus::Paused,
            "removing" => ContainerStatus::Removing,
            "exited" => ContainerStatus::Stopped,
            "dead" => ContainerStatus::Dead,
            other => ContainerStatus::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ContainerStatus::Created => "created",
            ContainerStatus::Running => "running",
            ContainerStatus::Paused => "paused",
            ContainerStatus::Removing => "removing",
            ContainerStatus::Stopped => "exited",
            ContainerStatus::Dead => "dead",
            ContainerStatus::Unknown(s) => s,
        }
    }
}

/// Runtime view of one container
#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub id: String,
    pub image: String,
    pub status: ContainerStatus,
    pub labels: HashMap<String, String>,
    /// container_port -> host_port
    pub ports: HashMap<u16, u16>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecRequest {
    pub cmd: Vec<String>,
    pub working_dir: Option<String>,
    pub env: HashMap<String, String>,
}

impl ExecRequest {
    pub fn new<I, S>(cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cmd: cmd.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Wraps a command line in `sh -c`
    pub fn shell(command: &str) -> Self {
        Self::new(["sh", "-c", command])
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

/// Result of an attached exec, with stdout and stderr merged in arrival order
#[derive(Debug, Clone, Default)]
pub struct ExecOutput {
    pub exit_code: i64,
    pub output: Vec<u8>,
}

/// Container runtime primitives used by the sandbox orchestrator
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Check whether the runtime daemon answers
    async fn is_available(&self) -> bool;

    async fn image_exists(&self, image: &str) -> Result<bool>;

    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Create a container without starting it, returning its runtime-assigned id
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    async fn start_container(&self, container_id: &str) -> Result<()>;

    async fn inspect_container(&self, container_id: &str) -> Result<ContainerInfo>;

    async fn stop_container(&self, container_id: &str, timeout_secs: u64) -> Result<()>;

    async fn remove_container(&self, container_id: &str, force: bool) -> Result<()>;

    /// List running containers carrying every given `key=value` label
    async fn list_containers(&self, labels: &[(String, String)]) -> Result<Vec<ContainerInfo>>;

    /// Run a command and wait for it to finish
    async fn exec(&self, container_id: &str, request: &ExecRequest) -> Result<ExecOutput>;

    /// Start a command without attaching; returns the exec id
    async fn exec_detached(&self, container_id: &str, request: &ExecRequest) -> Result<String>;

    /// Unpack a tar archive into `dir` inside the container
    async fn put_archive(&self, container_id: &str, dir: &str, archive: Vec<u8>) -> Result<()>;

    /// Fetch `path` from the container as a tar archive
    async fn get_archive(&self, container_id: &str, path: &str) -> Result<Vec<u8>>;
}
