// ABOUTME: Sandbox data model shared by the registry, orchestrator and tool layer
// ABOUTME: Sandbox handle, listing summaries, destroy outcomes and cleanup reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxStatus {
    Running,
}

/// Handle to one isolated, resource-capped container owned by a single user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sandbox {
    pub id: String,
    pub owner: String,
    pub image: String,
    pub working_directory: String,
    pub host_mount_path: PathBuf,
    pub exposed_port: Option<u16>,
    pub memory_limit_mb: u64,
    pub cpu_quota: i64,
    pub cpu_period: i64,
    pub created_at: DateTime<Utc>,
    pub cleanup_deadline: DateTime<Utc>,
    pub status: SandboxStatus,
}

impl Sandbox {
    pub fn timeout_minutes(&self) -> i64 {
        (self.cleanup_deadline - self.created_at).num_minutes()
    }
}

/// One row of `List(owner)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SandboxSummary {
    pub container_id: String,
    pub image: String,
    pub status: String,
    pub host_port: Option<u16>,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestroyOutcome {
    Destroyed,
    AlreadyDestroyed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanupFailure {
    pub container_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanupReport {
    pub destroyed_count: usize,
    pub destroyed: Vec<String>,
    pub errors: Vec<CleanupFailure>,
}

/// Result of a foreground or background command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub output: String,
    pub exit_code: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileListing {
    pub path: String,
    pub files: Vec<String>,
    pub count: usize,
}
