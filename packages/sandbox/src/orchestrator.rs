// ABOUTME: Sandbox orchestrator composing the runtime, registry, executor and file transfer
// ABOUTME: Creates, destroys, lists and auto-expires per-user sandboxes and provisions git credentials

use crate::error::{Result, SandboxError};
use crate::executor::{CommandExecutor, ExecuteCommandRequest};
use crate::files::FileTransfer;
use crate::registry::SandboxRegistry;
use crate::runtime::{ContainerRuntime, ContainerSpec, RuntimeError, VolumeMount};
use crate::settings::{
    SandboxSettings, LABEL_CREATED_AT, LABEL_MANAGED, LABEL_TYPE, LABEL_USER_ID, NETRC_FILENAME,
    NETRC_MODE, SANDBOX_TYPE,
};
use crate::types::{
    CleanupFailure, CleanupReport, CommandOutput, DestroyOutcome, FileListing, Sandbox,
    SandboxStatus, SandboxSummary,
};
use chrono::Utc;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Keeps a no-op foreground process alive so the container stays up for exec
const IDLE_COMMAND: [&str; 3] = ["tail", "-f", "/dev/null"];

#[derive(Clone)]
pub struct SandboxOrchestrator {
    runtime: Arc<dyn ContainerRuntime>,
    registry: Arc<SandboxRegistry>,
    settings: Arc<SandboxSettings>,
    executor: CommandExecutor,
    files: FileTransfer,
}

/// Keep only characters that are safe in a single path segment
fn path_segment(value: &str) -> String {
    let cleaned: String = value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        "anonymous".to_string()
    } else {
        cleaned
    }
}

/// Create a fresh directory at `base`, suffixing `-N` if the name is taken
async fn create_unique_dir(base: &Path) -> Result<PathBuf> {
    if let Some(parent) = base.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut candidate = base.to_path_buf();
    let mut attempt = 0u32;
    loop {
        match tokio::fs::create_dir(&candidate).await {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                attempt += 1;
                let name = format!(
                    "{}-{}",
                    base.file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    attempt
                );
                candidate = base.with_file_name(name);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

impl SandboxOrchestrator {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, settings: SandboxSettings) -> Self {
        let settings = Arc::new(settings);
        let executor = CommandExecutor::new(runtime.clone(), settings.clone());
        let files = FileTransfer::new(runtime.clone(), executor.clone(), settings.clone());

        Self {
            runtime,
            registry: Arc::new(SandboxRegistry::new()),
            settings,
            executor,
            files,
        }
    }

    pub fn settings(&self) -> &SandboxSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<SandboxRegistry> {
        &self.registry
    }

    pub fn executor(&self) -> &CommandExecutor {
        &self.executor
    }

    pub fn files(&self) -> &FileTransfer {
        &self.files
    }

    pub async fn is_available(&self) -> bool {
        self.runtime.is_available().await
    }

    /// Start a sandbox for `owner` and arm its cleanup timer.
    ///
    /// The image must be on the allow-list. Pulls it first if it is not
    /// present locally. Any runtime failure is returned as-is; nothing is
    /// retried.
    pub async fn create_sandbox(&self, owner: &str, image: &str) -> Result<Sandbox> {
        self.settings.validate_image(image)?;
        self.ensure_image(image).await?;

        let created_at = Utc::now();
        let base = self
            .settings
            .absolute_data_dir()?
            .join(path_segment(owner))
            .join(created_at.format("%Y%m%d%H%M%S%3f").to_string());
        let host_dir = create_unique_dir(&base).await?;

        let mut labels = HashMap::new();
        labels.insert(LABEL_USER_ID.to_string(), owner.to_string());
        labels.insert(LABEL_TYPE.to_string(), SANDBOX_TYPE.to_string());
        labels.insert(LABEL_CREATED_AT.to_string(), created_at.to_rfc3339());
        labels.insert(LABEL_MANAGED.to_string(), "true".to_string());

        let spec = ContainerSpec {
            image: image.to_string(),
            command: IDLE_COMMAND.iter().map(|s| s.to_string()).collect(),
            working_dir: self.settings.working_dir.clone(),
            binds: vec![VolumeMount {
                host_path: host_dir.to_string_lossy().to_string(),
                container_path: self.settings.working_dir.clone(),
                readonly: false,
            }],
            exposed_port: self.settings.container_port,
            memory_bytes: self.settings.memory_bytes(),
            cpu_quota: self.settings.cpu_quota,
            cpu_period: self.settings.cpu_period,
            labels,
            network_mode: "bridge".to_string(),
        };

        info!("Creating {} sandbox for owner {}", image, owner);
        let id = match self.runtime.create_container(&spec).await {
            Ok(id) => id,
            Err(e) => {
                error!("Failed to create sandbox for {}: {}", owner, e);
                if let Err(cleanup) = tokio::fs::remove_dir(&host_dir).await {
                    debug!("Could not remove {}: {}", host_dir.display(), cleanup);
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self.runtime.start_container(&id).await {
            error!("Failed to start sandbox {} for {}: {}", id, owner, e);
            if let Err(cleanup) = self.runtime.remove_container(&id, true).await {
                warn!("Failed to remove unstarted sandbox {}: {}", id, cleanup);
            }
            if let Err(cleanup) = tokio::fs::remove_dir(&host_dir).await {
                debug!("Could not remove {}: {}", host_dir.display(), cleanup);
            }
            return Err(e.into());
        }

        let info = match self.runtime.inspect_container(&id).await {
            Ok(info) => info,
            Err(e) => {
                error!("Failed to inspect new sandbox {}: {}", id, e);
                if let Err(cleanup) = self.runtime.remove_container(&id, true).await {
                    warn!("Failed to remove uninspectable sandbox {}: {}", id, cleanup);
                }
                return Err(e.into());
            }
        };

        let timeout = self.settings.cleanup_timeout;
        let sandbox = Sandbox {
            id: id.clone(),
            owner: owner.to_string(),
            image: image.to_string(),
            working_directory: self.settings.working_dir.clone(),
            host_mount_path: host_dir,
            exposed_port: info.ports.get(&self.settings.container_port).copied(),
            memory_limit_mb: self.settings.memory_mb,
            cpu_quota: self.settings.cpu_quota,
            cpu_period: self.settings.cpu_period,
            created_at,
            cleanup_deadline: created_at + chrono::Duration::milliseconds(timeout.as_millis() as i64),
            status: SandboxStatus::Running,
        };

        self.registry.insert(sandbox.clone()).await;
        self.arm_cleanup(&id, timeout).await;

        info!(
            "Sandbox {} running for {} (host port {:?}, expires {})",
            id, owner, sandbox.exposed_port, sandbox.cleanup_deadline
        );
        Ok(sandbox)
    }

    // Boxed because the timer callback calls `destroy`, which re-arms on failure
    fn arm_cleanup(&self, id: &str, delay: Duration) -> BoxFuture<'_, ()> {
        let orchestrator = self.clone();
        let id = id.to_string();
        Box::pin(async move {
            let expiring = id.clone();
            self.registry
                .arm_timer(&id, delay, move || async move {
                    info!("Sandbox {} reached its cleanup deadline", expiring);
                    if let Err(e) = orchestrator.destroy(&expiring).await {
                        error!("Scheduled cleanup of {} failed: {}", expiring, e);
                    }
                })
                .await;
        })
    }

    async fn ensure_image(&self, image: &str) -> Result<()> {
        if self.runtime.image_exists(image).await? {
            debug!("Image {} already present", image);
            return Ok(());
        }
        info!("Image {} not found locally, pulling", image);
        self.runtime.pull_image(image).await?;
        Ok(())
    }

    /// Stop and remove a sandbox. Safe to call any number of times, including
    /// concurrently with its cleanup timer.
    pub async fn destroy(&self, id: &str) -> Result<DestroyOutcome> {
        self.registry.cancel_timer(id).await;

        let outcome = match self.stop_and_remove(id).await {
            Ok(()) => DestroyOutcome::Destroyed,
            Err(e) if e.is_not_found() => DestroyOutcome::AlreadyDestroyed,
            Err(e) => {
                error!("Failed to destroy sandbox {}: {}", id, e);
                // Still running, so it needs a deadline again
                if self.registry.get(id).await.is_some() {
                    self.arm_cleanup(id, self.settings.cleanup_timeout).await;
                }
                return Err(e.into());
            }
        };

        self.registry.remove(id).await;
        match outcome {
            DestroyOutcome::Destroyed => info!("Destroyed sandbox {}", id),
            DestroyOutcome::AlreadyDestroyed => debug!("Sandbox {} was already gone", id),
        }
        Ok(outcome)
    }

    #[deprecated(note = "use destroy")]
    pub async fn stop_sandbox(&self, id: &str) -> Result<DestroyOutcome> {
        self.destroy(id).await
    }

    async fn stop_and_remove(&self, id: &str) -> std::result::Result<(), RuntimeError> {
        match self
            .runtime
            .stop_container(id, self.settings.stop_timeout_secs)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Err(e),
            Err(e) => warn!("Failed to stop {} cleanly, forcing removal: {}", id, e),
        }
        self.runtime.remove_container(id, true).await
    }

    /// Running sandboxes labelled with `owner`
    pub async fn list(&self, owner: &str) -> Result<Vec<SandboxSummary>> {
        let filters = vec![
            (LABEL_USER_ID.to_string(), owner.to_string()),
            (LABEL_TYPE.to_string(), SANDBOX_TYPE.to_string()),
        ];
        let containers = self.runtime.list_containers(&filters).await?;

        Ok(containers
            .into_iter()
            .map(|c| SandboxSummary {
                host_port: c.ports.get(&self.settings.container_port).copied(),
                status: c.status.as_str().to_string(),
                created_at: c.labels.get(LABEL_CREATED_AT).cloned().unwrap_or_default(),
                container_id: c.id,
                image: c.image,
            })
            .collect())
    }

    /// Destroy every sandbox `owner` has; per-item failures are collected, not raised
    pub async fn cleanup_all(&self, owner: &str) -> Result<CleanupReport> {
        let sandboxes = self.list(owner).await?;
        let mut report = CleanupReport::default();

        for summary in sandboxes {
            match self.destroy(&summary.container_id).await {
                Ok(_) => report.destroyed.push(summary.container_id),
                Err(e) => report.errors.push(CleanupFailure {
                    container_id: summary.container_id,
                    error: e.to_string(),
                }),
            }
        }

        report.destroyed_count = report.destroyed.len();
        info!(
            "Cleanup for {}: {} destroyed, {} failed",
            owner,
            report.destroyed_count,
            report.errors.len()
        );
        Ok(report)
    }

    /// Fail with `NotFound` if `id` is known to belong to someone other than `owner`.
    ///
    /// A container the runtime no longer knows passes, so the operation
    /// itself can report it as missing or already destroyed.
    pub async fn check_owner(&self, owner: &str, id: &str) -> Result<()> {
        if let Some(sandbox) = self.registry.get(id).await {
            return if sandbox.owner == owner {
                Ok(())
            } else {
                Err(SandboxError::NotFound(id.to_string()))
            };
        }

        match self.runtime.inspect_container(id).await {
            Ok(info) => match info.labels.get(LABEL_USER_ID) {
                Some(label) if label == owner => Ok(()),
                _ => Err(SandboxError::NotFound(id.to_string())),
            },
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Write a `.netrc` for the git host and set the global git identity.
    pub async fn setup_git_credentials(&self, id: &str, token: &str, username: &str) -> Result<()> {
        let netrc = format!(
            "machine {}\nlogin {}\npassword {}\n",
            self.settings.git_host, username, token
        );
        let home = &self.settings.home_dir;
        self.files
            .put_file(id, home, NETRC_FILENAME, netrc.as_bytes(), NETRC_MODE)
            .await?;

        let netrc_path = format!("{}/{}", home.trim_end_matches('/'), NETRC_FILENAME);
        let commands: [&[&str]; 4] = [
            &["chmod", "600", netrc_path.as_str()],
            &[
                "git",
                "config",
                "--global",
                "user.email",
                self.settings.git_user_email.as_str(),
            ],
            &[
                "git",
                "config",
                "--global",
                "user.name",
                self.settings.git_user_name.as_str(),
            ],
            &["git", "config", "--global", "credential.helper", "store"],
        ];

        for argv in commands {
            let result = self.executor.run_argv(id, argv).await?;
            if result.exit_code != 0 {
                warn!(
                    "Git setup step '{}' in {} exited with {}: {}",
                    argv.join(" "),
                    id,
                    result.exit_code,
                    result.output.trim()
                );
            }
        }

        info!("Configured git credentials for {} in {}", username, id);
        Ok(())
    }

    pub async fn execute(&self, request: ExecuteCommandRequest) -> Result<CommandOutput> {
        self.executor.execute(request).await
    }

    pub async fn write_file(&self, id: &str, path: &str, content: &str) -> Result<String> {
        self.files.write(id, path, content).await
    }

    pub async fn read_file(&self, id: &str, path: &str) -> Result<String> {
        self.files.read(id, path).await
    }

    pub async fn list_files(&self, id: &str, path: &str) -> Result<FileListing> {
        self.files.list(id, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_segment() {
        assert_eq!(path_segment("42"), "42");
        assert_eq!(path_segment("../etc"), "___etc");
        assert_eq!(path_segment(""), "anonymous");
    }

    #[tokio::test]
    async fn test_create_unique_dir_suffixes_collisions() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path().join("42").join("20260101000000000");

        let first = create_unique_dir(&base).await.unwrap();
        let second = create_unique_dir(&base).await.unwrap();

        assert_eq!(first, base);
        assert_eq!(second, temp.path().join("42").join("20260101000000000-1"));
        assert!(second.is_dir());
    }
}
