// ABOUTME: Docker runtime implementation for local container-based sandboxes
// ABOUTME: Uses the bollard client for container lifecycle, exec and archive transfer

use super::{
    ContainerInfo, ContainerRuntime, ContainerSpec, ContainerStatus, ExecOutput, ExecRequest,
    Result, RuntimeError,
};
use async_trait::async_trait;
use bollard::{
    container::{
        Config, CreateContainerOptions, DownloadFromContainerOptions, ListContainersOptions,
        LogOutput, RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
        UploadToContainerOptions,
    },
    errors::Error as BollardError,
    exec::{CreateExecOptions, StartExecOptions, StartExecResults},
    image::CreateImageOptions,
    Docker,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default bound on a single image pull
const DEFAULT_PULL_TIMEOUT: Duration = Duration::from_secs(600);

pub struct DockerRuntime {
    client: Docker,
    pull_timeout: Duration,
}

impl DockerRuntime {
    /// Connect to the local Docker daemon with the default pull timeout
    pub fn new() -> Result<Self> {
        Self::with_pull_timeout(DEFAULT_PULL_TIMEOUT)
    }

    pub fn with_pull_timeout(timeout: Duration) -> Result<Self> {
        let client = Docker::connect_with_defaults()
            .map_err(|e| RuntimeError::Connection(format!("Docker unavailable: {}", e)))?;

        Ok(Self {
            client,
            pull_timeout: timeout,
        })
    }

    fn to_bollard_config(spec: &ContainerSpec) -> Config<String> {
        let port_key = format!("{}/tcp", spec.exposed_port);

        let mut exposed_ports = HashMap::new();
        exposed_ports.insert(port_key.clone(), HashMap::new());

        // No host port: the daemon picks a free one
        let mut port_bindings = HashMap::new();
        port_bindings.insert(
            port_key,
            Some(vec![bollard::models::PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: None,
            }]),
        );

        let binds: Vec<String> = spec
            .binds
            .iter()
            .map(|v| {
                format!(
                    "{}:{}:{}",
                    v.host_path,
                    v.container_path,
                    if v.readonly { "ro" } else { "rw" }
                )
            })
            .collect();

        let host_config = bollard::models::HostConfig {
            binds: Some(binds),
            port_bindings: Some(port_bindings),
            memory: Some(spec.memory_bytes),
            cpu_quota: Some(spec.cpu_quota),
            cpu_period: Some(spec.cpu_period),
            network_mode: Some(spec.network_mode.clone()),
            ..Default::default()
        };

        Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command.clone()),
            working_dir: Some(spec.working_dir.clone()),
            labels: Some(spec.labels.clone()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            ..Default::default()
        }
    }
}

/// Map a bollard error, keeping 404 distinguishable from other failures
fn map_error(err: BollardError, subject: &str) -> RuntimeError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404,
            message,
        } => RuntimeError::NotFound(format!("{}: {}", subject, message)),
        other => RuntimeError::Container(format!("{}: {}", subject, other)),
    }
}

fn parse_port_key(key: &str) -> Option<u16> {
    key.split('/').next().and_then(|p| p.parse::<u16>().ok())
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn is_available(&self) -> bool {
        match self.client.ping().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Docker not available: {}", e);
                false
            }
        }
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        match self.client.inspect_image(image).await {
            Ok(_) => Ok(true),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(false),
            Err(e) => Err(RuntimeError::Image(e.to_string())),
        }
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        info!("Pulling image: {} (timeout: {:?})", image, self.pull_timeout);

        let options = CreateImageOptions {
            from_image: image.to_string(),
            ..Default::default()
        };

        let stream = self.client.create_image(Some(options), None, None);

        let result = tokio::time::timeout(self.pull_timeout, async {
            let mut stream = stream;
            let mut last_status = String::new();

            while let Some(result) = stream.next().await {
                match result {
                    Ok(info) => {
                        if let Some(status) = &info.status {
                            if status != &last_status {
                                debug!("Pull status: {}", status);
                                last_status = status.clone();
                            }
                        }
                        if let Some(error) = info.error {
                            return Err(RuntimeError::Image(format!(
                                "Failed to pull image {}: {}",
                                image, error
                            )));
                        }
                    }
                    Err(e) => {
                        return Err(RuntimeError::Image(format!(
                            "Failed to pull image {}: {}",
                            image, e
                        )));
                    }
                }
            }

            Ok(())
        })
        .await;

        match result {
            Ok(Ok(())) => {
                info!("Successfully pulled image: {}", image);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RuntimeError::Image(format!(
                "Timeout pulling image {} after {:?}",
                image, self.pull_timeout
            ))),
        }
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let config = Self::to_bollard_config(spec);
        let container = self
            .client
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(|e| RuntimeError::Container(e.to_string()))?;

        debug!("Created container {} from {}", container.id, spec.image);
        Ok(container.id)
    }

    async fn start_container(&self, container_id: &str) -> Result<()> {
        self.client
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| map_error(e, container_id))?;

        info!("Started container {}", container_id);
        Ok(())
    }

    async fn inspect_container(&self, container_id: &str) -> Result<ContainerInfo> {
        let inspect = self
            .client
            .inspect_container(container_id, None)
            .await
            .map_err(|e| map_error(e, container_id))?;

        let status = ContainerStatus::from_state(
            inspect
                .state
                .as_ref()
                .and_then(|s| s.status.as_ref())
                .map(|s| s.as_ref())
                .unwrap_or("unknown"),
        );

        let mut ports = HashMap::new();
        if let Some(port_map) = inspect
            .network_settings
            .as_ref()
            .and_then(|ns| ns.ports.as_ref())
        {
            for (key, bindings) in port_map {
                let host_port = bindings
                    .as_ref()
                    .and_then(|b| b.first())
                    .and_then(|b| b.host_port.as_ref())
                    .and_then(|p| p.parse::<u16>().ok());
                if let (Some(container_port), Some(host_port)) = (parse_port_key(key), host_port)
                {
                    ports.insert(container_port, host_port);
                }
            }
        }

        let config = inspect.config.unwrap_or_default();

        Ok(ContainerInfo {
            id: inspect.id.unwrap_or_else(|| container_id.to_string()),
            image: config.image.unwrap_or_else(|| "unknown".to_string()),
            status,
            labels: config.labels.unwrap_or_default(),
            ports,
        })
    }

    async fn stop_container(&self, container_id: &str, timeout_secs: u64) -> Result<()> {
        info!(
            "Stopping container: {} (timeout: {}s)",
            container_id, timeout_secs
        );

        let options = StopContainerOptions {
            t: timeout_secs as i64,
        };

        match self.client.stop_container(container_id, Some(options)).await {
            Ok(()) => Ok(()),
            // Already stopped
            Err(BollardError::DockerResponseServerError {
                status_code: 304, ..
            }) => Ok(()),
            Err(e) => Err(map_error(e, container_id)),
        }
    }

    async fn remove_container(&self, container_id: &str, force: bool) -> Result<()> {
        info!("Removing container: {} (force: {})", container_id, force);

        let options = RemoveContainerOptions {
            force,
            v: true,
            ..Default::default()
        };

        self.client
            .remove_container(container_id, Some(options))
            .await
            .map_err(|e| map_error(e, container_id))
    }

    async fn list_containers(&self, labels: &[(String, String)]) -> Result<Vec<ContainerInfo>> {
        let mut filters = HashMap::new();
        filters.insert(
            "label".to_string(),
            labels
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>(),
        );

        let options = ListContainersOptions {
            all: false,
            filters,
            ..Default::default()
        };

        let containers = self
            .client
            .list_containers(Some(options))
            .await
            .map_err(|e| RuntimeError::Container(e.to_string()))?;

        Ok(containers
            .into_iter()
            .filter_map(|summary| {
                let id = summary.id?;
                let ports = summary
                    .ports
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|p| p.public_port.map(|public| (p.private_port, public)))
                    .collect();
                Some(ContainerInfo {
                    id,
                    image: summary.image.unwrap_or_else(|| "unknown".to_string()),
                    status: ContainerStatus::from_state(
                        summary.state.as_deref().unwrap_or("unknown"),
                    ),
                    labels: summary.labels.unwrap_or_default(),
                    ports,
                })
            })
            .collect())
    }

    async fn exec(&self, container_id: &str, request: &ExecRequest) -> Result<ExecOutput> {
        debug!("Exec in container {}: {:?}", container_id, request.cmd);

        let exec = self
            .client
            .create_exec(container_id, to_exec_options(request, true))
            .await
            .map_err(|e| map_error(e, container_id))?;

        let start_result = self
            .client
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| RuntimeError::Exec(e.to_string()))?;

        let mut output = Vec::new();
        match start_result {
            StartExecResults::Attached { output: mut stream, .. } => {
                while let Some(msg) = stream.next().await {
                    match msg {
                        Ok(LogOutput::StdOut { message })
                        | Ok(LogOutput::StdErr { message })
                        | Ok(LogOutput::Console { message }) => {
                            output.extend_from_slice(&message)
                        }
                        Ok(_) => {}
                        Err(e) => return Err(RuntimeError::Exec(e.to_string())),
                    }
                }
            }
            StartExecResults::Detached => {
                return Err(RuntimeError::Exec(
                    "Exec was detached unexpectedly".to_string(),
                ))
            }
        }

        let exec_inspect = self
            .client
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| RuntimeError::Exec(e.to_string()))?;

        Ok(ExecOutput {
            exit_code: exec_inspect.exit_code.unwrap_or(0),
            output,
        })
    }

    async fn exec_detached(&self, container_id: &str, request: &ExecRequest) -> Result<String> {
        let exec = self
            .client
            .create_exec(container_id, to_exec_options(request, false))
            .await
            .map_err(|e| map_error(e, container_id))?;

        let options = StartExecOptions {
            detach: true,
            ..Default::default()
        };

        self.client
            .start_exec(&exec.id, Some(options))
            .await
            .map_err(|e| RuntimeError::Exec(e.to_string()))?;

        debug!("Started detached exec {} in {}", exec.id, container_id);
        Ok(exec.id)
    }

    async fn put_archive(&self, container_id: &str, dir: &str, archive: Vec<u8>) -> Result<()> {
        debug!(
            "Uploading {} byte archive to {}:{}",
            archive.len(),
            container_id,
            dir
        );

        let options = UploadToContainerOptions {
            path: dir.to_string(),
            ..Default::default()
        };

        self.client
            .upload_to_container(container_id, Some(options), archive.into())
            .await
            .map_err(|e| map_error(e, &format!("{}:{}", container_id, dir)))
    }

    async fn get_archive(&self, container_id: &str, path: &str) -> Result<Vec<u8>> {
        debug!("Downloading {}:{}", container_id, path);

        let options = DownloadFromContainerOptions {
            path: path.to_string(),
        };

        let mut stream = self
            .client
            .download_from_container(container_id, Some(options));

        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| map_error(e, path))?;
            data.extend_from_slice(&bytes);
        }

        Ok(data)
    }
}

fn to_exec_options(request: &ExecRequest, attach: bool) -> CreateExecOptions<String> {
    let env: Vec<String> = request
        .env
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();

    CreateExecOptions {
        cmd: Some(request.cmd.clone()),
        env: if env.is_empty() { None } else { Some(env) },
        working_dir: request.working_dir.clone(),
        attach_stdout: Some(attach),
        attach_stderr: Some(attach),
        ..Default::default()
    }
}
