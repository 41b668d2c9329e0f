// ABOUTME: File transfer unit for reading and writing files inside sandboxes
// ABOUTME: Uses single-entry tar archives because the runtime exposes file I/O only as archive streams

use crate::archive::{self, DEFAULT_FILE_MODE};
use crate::error::{Result, SandboxError};
use crate::executor::CommandExecutor;
use crate::runtime::{ContainerRuntime, ExecRequest};
use crate::settings::SandboxSettings;
use crate::types::FileListing;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Clone)]
pub struct FileTransfer {
    runtime: Arc<dyn ContainerRuntime>,
    executor: CommandExecutor,
    settings: Arc<SandboxSettings>,
}

/// Split an absolute path into (parent directory, file name)
fn split_path(path: &str) -> (String, String) {
    match path.rsplit_once('/') {
        Some(("", name)) => ("/".to_string(), name.to_string()),
        Some((dir, name)) => (dir.to_string(), name.to_string()),
        None => ("/".to_string(), path.to_string()),
    }
}

/// Quote a value for safe interpolation into an `sh -c` command line
pub(crate) fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

impl FileTransfer {
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        executor: CommandExecutor,
        settings: Arc<SandboxSettings>,
    ) -> Self {
        Self {
            runtime,
            executor,
            settings,
        }
    }

    /// Write `content` to `path`, creating parent directories. Existing files are overwritten.
    pub async fn write(&self, sandbox_id: &str, path: &str, content: &str) -> Result<String> {
        let absolute = self.settings.resolve_path(path);
        let (dir, name) = split_path(&absolute);

        info!("Writing {} bytes to {}:{}", content.len(), sandbox_id, absolute);

        self.executor
            .run_argv(sandbox_id, &["mkdir", "-p", &dir])
            .await?;
        self.put_file(sandbox_id, &dir, &name, content.as_bytes(), DEFAULT_FILE_MODE)
            .await?;

        Ok(absolute)
    }

    /// Upload one file with an explicit mode into an existing directory
    pub async fn put_file(
        &self,
        sandbox_id: &str,
        dir: &str,
        name: &str,
        contents: &[u8],
        mode: u32,
    ) -> Result<()> {
        let tar = archive::pack_file(name, contents, mode)?;
        self.runtime
            .put_archive(sandbox_id, dir, tar)
            .await
            .map_err(|e| SandboxError::for_container(e, sandbox_id))
    }

    /// Read a file as text. Invalid UTF-8 is replaced, never truncated.
    pub async fn read(&self, sandbox_id: &str, path: &str) -> Result<String> {
        let absolute = self.settings.resolve_path(path);
        debug!("Reading {}:{}", sandbox_id, absolute);

        let tar = self
            .runtime
            .get_archive(sandbox_id, &absolute)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    SandboxError::FileNotFound(absolute.clone())
                } else {
                    SandboxError::Runtime(e)
                }
            })?;

        let contents = archive::first_file(&tar).map_err(|e| SandboxError::Archive(e.to_string()))?;
        Ok(contents
            .map(|bytes| String::from_utf8_lossy(&bytes).to_string())
            .unwrap_or_default())
    }

    /// Bounded listing of files and directories under `path`
    pub async fn list(&self, sandbox_id: &str, path: &str) -> Result<FileListing> {
        let absolute = self.settings.resolve_path(path);
        let command = format!(
            "find {} -maxdepth {} -type f -o -type d | head -{}",
            shell_quote(&absolute),
            self.settings.list_max_depth,
            self.settings.list_max_count
        );

        let result = self
            .runtime
            .exec(sandbox_id, &ExecRequest::shell(&command))
            .await
            .map_err(|e| SandboxError::for_container(e, sandbox_id))?;

        let output = String::from_utf8_lossy(&result.output).to_string();
        if result.exit_code != 0 {
            return Err(SandboxError::ListFailed(output));
        }

        let files: Vec<String> = output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        Ok(FileListing {
            path: absolute,
            count: files.len(),
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ExecOutput, InMemoryRuntime};
    use pretty_assertions::assert_eq;

    async fn setup() -> (Arc<InMemoryRuntime>, FileTransfer, String) {
        let runtime = Arc::new(InMemoryRuntime::new());
        let id = runtime.start_bare_container("python:3.11").await;
        let settings = Arc::new(SandboxSettings::default());
        let executor = CommandExecutor::new(runtime.clone(), settings.clone());
        let files = FileTransfer::new(runtime.clone(), executor, settings);
        (runtime, files, id)
    }

    #[test]
    fn test_split_path() {
        assert_eq!(
            split_path("/app/src/main.py"),
            ("/app/src".to_string(), "main.py".to_string())
        );
        assert_eq!(
            split_path("/hello.txt"),
            ("/".to_string(), "hello.txt".to_string())
        );
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/app"), "'/app'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let (_runtime, files, id) = setup().await;
        let content = "print('héllo')\n# second line\n";

        let written = files.write(&id, "src/main.py", content).await.unwrap();
        assert_eq!(written, "/app/src/main.py");

        assert_eq!(files.read(&id, "src/main.py").await.unwrap(), content);
        assert_eq!(files.read(&id, "/app/src/main.py").await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_write_creates_parent_directory_first() {
        let (runtime, files, id) = setup().await;

        files.write(&id, "a/b/c.txt", "x").await.unwrap();

        let calls = runtime.exec_calls(&id);
        assert_eq!(calls[0].cmd, vec!["mkdir", "-p", "/app/a/b"]);
    }

    #[tokio::test]
    async fn test_write_overwrites_silently() {
        let (_runtime, files, id) = setup().await;

        files.write(&id, "notes.txt", "first").await.unwrap();
        files.write(&id, "notes.txt", "second").await.unwrap();

        assert_eq!(files.read(&id, "notes.txt").await.unwrap(), "second");
    }

    #[tokio::test]
    async fn test_read_missing_file_is_not_found() {
        let (_runtime, files, id) = setup().await;

        let err = files.read(&id, "nope.txt").await.unwrap_err();
        assert!(matches!(err, SandboxError::FileNotFound(p) if p == "/app/nope.txt"));
    }

    #[tokio::test]
    async fn test_list_parses_find_output() {
        let (runtime, files, id) = setup().await;
        runtime.script_exec(
            "find '/app' -maxdepth 2",
            ExecOutput {
                exit_code: 0,
                output: b"/app\n/app/main.py\n/app/src\n\n".to_vec(),
            },
        );

        let listing = files.list(&id, "/app").await.unwrap();
        assert_eq!(listing.path, "/app");
        assert_eq!(listing.files, vec!["/app", "/app/main.py", "/app/src"]);
        assert_eq!(listing.count, 3);

        let calls = runtime.exec_calls(&id);
        assert!(calls[0].cmd[2].ends_with("| head -100"));
    }

    #[tokio::test]
    async fn test_list_failure_carries_output() {
        let (runtime, files, id) = setup().await;
        runtime.script_exec(
            "find",
            ExecOutput {
                exit_code: 1,
                output: b"find: '/app/missing': No such file or directory".to_vec(),
            },
        );

        let err = files.list(&id, "missing").await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to list files: find:"));
    }
}
