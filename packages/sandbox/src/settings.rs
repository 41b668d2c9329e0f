// ABOUTME: Fixed sandbox settings: image allow-list, resource caps, paths, labels and git identity
// ABOUTME: Defaults mirror the production values; the CLI overrides caps and timeouts from config

use crate::error::{Result, SandboxError};
use std::path::PathBuf;
use std::time::Duration;

// Container labels used for filtered listing
pub const LABEL_USER_ID: &str = "user_id";
pub const LABEL_TYPE: &str = "type";
pub const LABEL_CREATED_AT: &str = "created_at";
pub const LABEL_MANAGED: &str = "sandcraft.managed";
pub const SANDBOX_TYPE: &str = "sandbox";

pub const SUPPORTED_IMAGES: &[&str] = &["node:18", "python:3.11"];

pub const NETRC_FILENAME: &str = ".netrc";
pub const NETRC_MODE: u32 = 0o600;

#[derive(Debug, Clone)]
pub struct SandboxSettings {
    pub allowed_images: Vec<String>,
    pub working_dir: String,
    pub home_dir: String,
    /// Host root under which each sandbox gets `<owner>/<timestamp>`
    pub data_dir: PathBuf,
    pub container_port: u16,
    pub memory_mb: u64,
    pub cpu_quota: i64,
    pub cpu_period: i64,
    pub cleanup_timeout: Duration,
    pub stop_timeout_secs: u64,
    pub list_max_depth: u32,
    pub list_max_count: u32,
    pub git_host: String,
    pub git_user_name: String,
    pub git_user_email: String,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            allowed_images: SUPPORTED_IMAGES.iter().map(|s| s.to_string()).collect(),
            working_dir: "/app".to_string(),
            home_dir: "/root".to_string(),
            data_dir: PathBuf::from("sandbox_data"),
            container_port: 3000,
            memory_mb: 512,
            cpu_quota: 50_000,
            cpu_period: 100_000,
            cleanup_timeout: Duration::from_secs(30 * 60),
            stop_timeout_secs: 5,
            list_max_depth: 2,
            list_max_count: 100,
            git_host: "github.com".to_string(),
            git_user_name: "AI Agent".to_string(),
            git_user_email: "agent@example.com".to_string(),
        }
    }
}

impl SandboxSettings {
    pub fn validate_image(&self, image: &str) -> Result<()> {
        if self.allowed_images.iter().any(|i| i == image) {
            Ok(())
        } else {
            Err(SandboxError::UnsupportedImage {
                image: image.to_string(),
                supported: self.allowed_images.join(", "),
            })
        }
    }

    pub fn memory_bytes(&self) -> i64 {
        (self.memory_mb as i64).saturating_mul(1024 * 1024)
    }

    /// Absolute form of `data_dir`, resolved against the current directory
    pub fn absolute_data_dir(&self) -> Result<PathBuf> {
        if self.data_dir.is_absolute() {
            Ok(self.data_dir.clone())
        } else {
            Ok(std::env::current_dir()?.join(&self.data_dir))
        }
    }

    /// Resolve a sandbox path against the working directory
    pub fn resolve_path(&self, path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{}", self.working_dir.trim_end_matches('/'), path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_allow_list() {
        let settings = SandboxSettings::default();
        assert!(settings.validate_image("node:18").is_ok());
        assert!(settings.validate_image("python:3.11").is_ok());

        let err = settings.validate_image("ubuntu:latest").unwrap_err();
        assert!(err.to_string().contains("ubuntu:latest"));
        assert!(err.to_string().contains("node:18"));
    }

    #[rstest]
    #[case("main.py", "/app/main.py")]
    #[case("src/index.js", "/app/src/index.js")]
    #[case("/etc/hosts", "/etc/hosts")]
    fn test_resolve_path(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(SandboxSettings::default().resolve_path(input), expected);
    }

    #[test]
    fn test_memory_bytes() {
        assert_eq!(SandboxSettings::default().memory_bytes(), 512 * 1024 * 1024);
    }
}
