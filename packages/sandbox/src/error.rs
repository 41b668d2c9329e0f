// ABOUTME: Error types for sandbox orchestration, command execution and file transfer
// ABOUTME: Wraps runtime failures and separates validation and not-found cases for callers

use crate::runtime::RuntimeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Unsupported image '{image}'. Supported images: {supported}")]
    UnsupportedImage { image: String, supported: String },

    #[error("Sandbox not found: {0}")]
    NotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to list files: {0}")]
    ListFailed(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SandboxError {
    /// Map a runtime error for an operation on `container_id`
    pub(crate) fn for_container(err: RuntimeError, container_id: &str) -> Self {
        if err.is_not_found() {
            SandboxError::NotFound(container_id.to_string())
        } else {
            SandboxError::Runtime(err)
        }
    }
}

pub type Result<T> = std::result::Result<T, SandboxError>;
