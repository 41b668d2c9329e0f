// ABOUTME: Container sandboxes for agent-driven code execution
// ABOUTME: Lifecycle orchestration, command execution, archive file transfer and timed cleanup

pub mod archive;
pub mod error;
pub mod executor;
pub mod files;
pub mod orchestrator;
pub mod registry;
pub mod runtime;
pub mod settings;
pub mod types;

pub use error::{Result, SandboxError};
pub use executor::{
    redact_credentials, CommandExecutor, ExecuteCommandRequest, BACKGROUND_STARTED_MESSAGE,
};
pub use files::FileTransfer;
pub use orchestrator::SandboxOrchestrator;
pub use registry::SandboxRegistry;
pub use runtime::{ContainerRuntime, DockerRuntime, RuntimeError};
#[cfg(any(test, feature = "test-utils"))]
pub use runtime::InMemoryRuntime;
pub use settings::{SandboxSettings, SUPPORTED_IMAGES};
pub use types::{
    CleanupFailure, CleanupReport, CommandOutput, DestroyOutcome, FileListing, Sandbox,
    SandboxStatus, SandboxSummary,
};
