// ABOUTME: In-memory container runtime for tests without a Docker daemon
// ABOUTME: Keeps a per-container file tree and scripted exec results, and records every call

use super::{
    ContainerInfo, ContainerRuntime, ContainerSpec, ContainerStatus, ExecOutput, ExecRequest,
    Result, RuntimeError,
};
use crate::archive::{self, ArchiveEntry, DEFAULT_FILE_MODE};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const FIRST_HOST_PORT: u16 = 49153;

struct FakeContainer {
    image: String,
    status: ContainerStatus,
    labels: HashMap<String, String>,
    ports: HashMap<u16, u16>,
    files: BTreeMap<String, (u32, Vec<u8>)>,
    exec_calls: Vec<ExecRequest>,
    detached_calls: Vec<ExecRequest>,
}

#[derive(Default)]
struct State {
    containers: HashMap<String, FakeContainer>,
    /// (substring of the joined command line, result), checked in insertion order
    scripts: Vec<(String, ExecOutput)>,
    delays: Vec<(String, Duration)>,
    pulled: Vec<String>,
    local_images: Vec<String>,
    specs: Vec<ContainerSpec>,
    next_id: u64,
    next_port: u16,
    remove_count: usize,
    fail_create: Option<String>,
    fail_start: Option<String>,
    fail_remove: HashMap<String, String>,
}

/// Fake runtime that behaves like a single-host Docker daemon
#[derive(Default)]
pub struct InMemoryRuntime {
    state: Mutex<State>,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a container without going through an orchestrator
    pub async fn start_bare_container(&self, image: &str) -> String {
        let spec = ContainerSpec {
            image: image.to_string(),
            command: vec!["tail".into(), "-f".into(), "/dev/null".into()],
            working_dir: "/app".to_string(),
            binds: Vec::new(),
            exposed_port: 0,
            memory_bytes: 0,
            cpu_quota: 0,
            cpu_period: 0,
            labels: HashMap::new(),
            network_mode: "bridge".to_string(),
        };
        self.insert_container(&spec, ContainerStatus::Running)
    }

    /// Any exec whose command line contains `pattern` returns `output`
    pub fn script_exec(&self, pattern: &str, output: ExecOutput) {
        self.state().scripts.push((pattern.to_string(), output));
    }

    /// Any exec whose command line contains `pattern` takes `delay` before it completes
    pub fn delay_exec(&self, pattern: &str, delay: Duration) {
        self.state().delays.push((pattern.to_string(), delay));
    }

    /// Make the next `create_container` calls fail with `message`
    pub fn fail_create(&self, message: &str) {
        self.state().fail_create = Some(message.to_string());
    }

    /// Make every `start_container` call fail with `message`
    pub fn fail_start(&self, message: &str) {
        self.state().fail_start = Some(message.to_string());
    }

    /// Make `remove_container` fail for one id
    pub fn fail_remove(&self, container_id: &str, message: &str) {
        self.state()
            .fail_remove
            .insert(container_id.to_string(), message.to_string());
    }

    /// Mark an image as already present locally
    pub fn add_local_image(&self, image: &str) {
        self.state().local_images.push(image.to_string());
    }

    /// Remove a container behind the caller's back, as an external `docker rm` would
    pub fn remove_externally(&self, container_id: &str) {
        self.state().containers.remove(container_id);
    }

    pub fn exec_calls(&self, container_id: &str) -> Vec<ExecRequest> {
        self.state()
            .containers
            .get(container_id)
            .map(|c| c.exec_calls.clone())
            .unwrap_or_default()
    }

    pub fn detached_calls(&self, container_id: &str) -> Vec<ExecRequest> {
        self.state()
            .containers
            .get(container_id)
            .map(|c| c.detached_calls.clone())
            .unwrap_or_default()
    }

    /// Raw file bytes and mode at an absolute path
    pub fn file(&self, container_id: &str, path: &str) -> Option<(u32, Vec<u8>)> {
        self.state()
            .containers
            .get(container_id)
            .and_then(|c| c.files.get(path).cloned())
    }

    pub fn container_exists(&self, container_id: &str) -> bool {
        self.state().containers.contains_key(container_id)
    }

    pub fn container_count(&self) -> usize {
        self.state().containers.len()
    }

    pub fn remove_count(&self) -> usize {
        self.state().remove_count
    }

    pub fn pulled_images(&self) -> Vec<String> {
        self.state().pulled.clone()
    }

    pub fn created_specs(&self) -> Vec<ContainerSpec> {
        self.state().specs.clone()
    }

    fn insert_container(&self, spec: &ContainerSpec, status: ContainerStatus) -> String {
        let mut state = self.state();
        state.next_id += 1;
        let id = format!("{:012x}", 0xc0ffee_000000u64 + state.next_id);

        let mut ports = HashMap::new();
        if spec.exposed_port != 0 {
            if state.next_port == 0 {
                state.next_port = FIRST_HOST_PORT;
            }
            ports.insert(spec.exposed_port, state.next_port);
            state.next_port += 1;
        }

        state.specs.push(spec.clone());
        state.containers.insert(
            id.clone(),
            FakeContainer {
                image: spec.image.clone(),
                status,
                labels: spec.labels.clone(),
                ports,
                files: BTreeMap::new(),
                exec_calls: Vec::new(),
                detached_calls: Vec::new(),
            },
        );
        id
    }

    fn info(id: &str, container: &FakeContainer) -> ContainerInfo {
        ContainerInfo {
            id: id.to_string(),
            image: container.image.clone(),
            status: container.status.clone(),
            labels: container.labels.clone(),
            ports: container.ports.clone(),
        }
    }
}

fn not_found(container_id: &str) -> RuntimeError {
    RuntimeError::NotFound(format!("No such container: {}", container_id))
}

fn join_path(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name.trim_start_matches("./"))
}

#[async_trait]
impl ContainerRuntime for InMemoryRuntime {
    async fn is_available(&self) -> bool {
        true
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        let state = self.state();
        Ok(state.local_images.iter().any(|i| i == image) || state.pulled.iter().any(|i| i == image))
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        self.state().pulled.push(image.to_string());
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        if let Some(message) = self.state().fail_create.clone() {
            return Err(RuntimeError::Container(message));
        }
        Ok(self.insert_container(spec, ContainerStatus::Created))
    }

    async fn start_container(&self, container_id: &str) -> Result<()> {
        let mut state = self.state();
        let fail_start = state.fail_start.clone();
        let container = state
            .containers
            .get_mut(container_id)
            .ok_or_else(|| not_found(container_id))?;
        if let Some(message) = fail_start {
            return Err(RuntimeError::Container(message));
        }
        container.status = ContainerStatus::Running;
        Ok(())
    }

    async fn inspect_container(&self, container_id: &str) -> Result<ContainerInfo> {
        let state = self.state();
        let container = state
            .containers
            .get(container_id)
            .ok_or_else(|| not_found(container_id))?;
        Ok(Self::info(container_id, container))
    }

    async fn stop_container(&self, container_id: &str, _timeout_secs: u64) -> Result<()> {
        let mut state = self.state();
        let container = state
            .containers
            .get_mut(container_id)
            .ok_or_else(|| not_found(container_id))?;
        container.status = ContainerStatus::Stopped;
        Ok(())
    }

    async fn remove_container(&self, container_id: &str, _force: bool) -> Result<()> {
        let mut state = self.state();
        if let Some(message) = state.fail_remove.get(container_id).cloned() {
            return Err(RuntimeError::Container(message));
        }
        state
            .containers
            .remove(container_id)
            .ok_or_else(|| not_found(container_id))?;
        state.remove_count += 1;
        Ok(())
    }

    async fn list_containers(&self, labels: &[(String, String)]) -> Result<Vec<ContainerInfo>> {
        let state = self.state();
        let mut matching: Vec<ContainerInfo> = state
            .containers
            .iter()
            .filter(|(_, c)| c.status == ContainerStatus::Running)
            .filter(|(_, c)| {
                labels
                    .iter()
                    .all(|(k, v)| c.labels.get(k).map(|l| l == v).unwrap_or(false))
            })
            .map(|(id, c)| Self::info(id, c))
            .collect();
        matching.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(matching)
    }

    async fn exec(&self, container_id: &str, request: &ExecRequest) -> Result<ExecOutput> {
        let command_line = request.cmd.join(" ");
        let delay = self
            .state()
            .delays
            .iter()
            .find(|(pattern, _)| command_line.contains(pattern.as_str()))
            .map(|(_, delay)| *delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        let scripted = state
            .scripts
            .iter()
            .find(|(pattern, _)| command_line.contains(pattern.as_str()))
            .map(|(_, output)| output.clone());

        let container = state
            .containers
            .get_mut(container_id)
            .ok_or_else(|| not_found(container_id))?;
        if container.status != ContainerStatus::Running {
            return Err(RuntimeError::Exec(format!(
                "Container {} is not running",
                container_id
            )));
        }
        container.exec_calls.push(request.clone());

        Ok(scripted.unwrap_or_default())
    }

    async fn exec_detached(&self, container_id: &str, request: &ExecRequest) -> Result<String> {
        let mut state = self.state();
        let container = state
            .containers
            .get_mut(container_id)
            .ok_or_else(|| not_found(container_id))?;
        container.detached_calls.push(request.clone());
        Ok(format!("exec-{}", container.detached_calls.len()))
    }

    async fn put_archive(&self, container_id: &str, dir: &str, archive: Vec<u8>) -> Result<()> {
        let entries =
            archive::read_entries(&archive).map_err(|e| RuntimeError::Archive(e.to_string()))?;

        let mut state = self.state();
        let container = state
            .containers
            .get_mut(container_id)
            .ok_or_else(|| not_found(container_id))?;
        for entry in entries {
            container
                .files
                .insert(join_path(dir, &entry.path), (entry.mode, entry.contents));
        }
        Ok(())
    }

    async fn get_archive(&self, container_id: &str, path: &str) -> Result<Vec<u8>> {
        let entries = {
            let state = self.state();
            let container = state
                .containers
                .get(container_id)
                .ok_or_else(|| not_found(container_id))?;

            if let Some((mode, contents)) = container.files.get(path) {
                let name = path.rsplit('/').next().unwrap_or(path);
                vec![ArchiveEntry {
                    path: name.to_string(),
                    mode: *mode,
                    contents: contents.clone(),
                }]
            } else {
                let prefix = format!("{}/", path.trim_end_matches('/'));
                let dir_name = path.trim_end_matches('/').rsplit('/').next().unwrap_or("");
                let nested: Vec<ArchiveEntry> = container
                    .files
                    .iter()
                    .filter_map(|(p, (mode, contents))| {
                        p.strip_prefix(&prefix).map(|rel| ArchiveEntry {
                            path: format!("{}/{}", dir_name, rel),
                            mode: *mode,
                            contents: contents.clone(),
                        })
                    })
                    .collect();
                if nested.is_empty() {
                    return Err(RuntimeError::NotFound(format!(
                        "Could not find the file {} in container {}",
                        path, container_id
                    )));
                }
                nested
            }
        };

        archive::pack_entries(&entries).map_err(|e| RuntimeError::Archive(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_archive_round_trip_keeps_mode() {
        let runtime = InMemoryRuntime::new();
        let id = runtime.start_bare_container("node:18").await;

        let tar = archive::pack_file(".netrc", b"machine github.com\n", 0o600).unwrap();
        runtime.put_archive(&id, "/root", tar).await.unwrap();

        let (mode, contents) = runtime.file(&id, "/root/.netrc").unwrap();
        assert_eq!(mode, 0o600);
        assert_eq!(contents, b"machine github.com\n");

        let fetched = runtime.get_archive(&id, "/root/.netrc").await.unwrap();
        assert_eq!(
            archive::first_file(&fetched).unwrap().unwrap(),
            b"machine github.com\n"
        );
    }

    #[tokio::test]
    async fn test_directory_archive_and_missing_path() {
        let runtime = InMemoryRuntime::new();
        let id = runtime.start_bare_container("node:18").await;
        let tar = archive::pack_file("index.js", b"x", DEFAULT_FILE_MODE).unwrap();
        runtime.put_archive(&id, "/app/src", tar).await.unwrap();

        let fetched = runtime.get_archive(&id, "/app").await.unwrap();
        let entries = archive::read_entries(&fetched).unwrap();
        assert_eq!(entries[0].path, "app/src/index.js");

        let err = runtime.get_archive(&id, "/nope").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_unknown_container_is_not_found() {
        let runtime = InMemoryRuntime::new();
        assert!(runtime.stop_container("x", 5).await.unwrap_err().is_not_found());
        assert!(runtime.remove_container("x", true).await.unwrap_err().is_not_found());
        assert!(runtime
            .exec("x", &ExecRequest::shell("ls"))
            .await
            .unwrap_err()
            .is_not_found());
    }
}
