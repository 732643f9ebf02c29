//! Docker-backed container provider
//!
//! Port and environment reads come from `docker inspect`. File probes exec into
//! the container (`test -f`, `cat`) relative to its working directory. Every
//! Docker call is bounded by the probe timeout.

use super::{parse_port_key, ContainerHandle, ContainerProvider, ProviderError};
use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, ListContainersOptions, LogOutput};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::ContainerInspectResponse;
use bollard::Docker;
use futures_util::stream::StreamExt;
use std::collections::BTreeSet;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Output of a finished exec
struct ExecOutput {
    exit_code: i64,
    stdout: Vec<u8>,
}

pub struct DockerProvider {
    docker: Docker,
    probe_timeout: Duration,
}

impl DockerProvider {
    /// Connects to the local Docker daemon (socket or `DOCKER_HOST`).
    pub fn connect(probe_timeout: Duration) -> Result<Self, ProviderError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        Ok(Self::with_client(docker, probe_timeout))
    }

    pub fn with_client(docker: Docker, probe_timeout: Duration) -> Self {
        Self {
            docker,
            probe_timeout,
        }
    }

    pub fn probe_timeout(&self) -> Duration {
        self.probe_timeout
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        match timeout(self.probe_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                operation: operation.to_string(),
                seconds: self.probe_timeout.as_secs(),
            }),
        }
    }

    async fn inspect(&self, reference: &str) -> Result<ContainerInspectResponse, ProviderError> {
        self.bounded("inspect container", async {
            self.docker
                .inspect_container(reference, None::<InspectContainerOptions>)
                .await
                .map_err(|e| map_error(e, reference))
        })
        .await
    }

    async fn exec(&self, container_id: &str, cmd: Vec<&str>) -> Result<ExecOutput, BollardError> {
        let exec = self
            .docker
            .create_exec(
                container_id,
                CreateExecOptions {
                    cmd: Some(cmd),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        let mut stdout = Vec::new();
        if let StartExecResults::Attached { mut output, .. } =
            self.docker.start_exec(&exec.id, None).await?
        {
            while let Some(chunk) = output.next().await {
                if let LogOutput::StdOut { message } = chunk? {
                    stdout.extend_from_slice(&message);
                }
            }
        }

        let inspect = self.docker.inspect_exec(&exec.id).await?;
        Ok(ExecOutput {
            exit_code: inspect.exit_code.unwrap_or(-1),
            stdout,
        })
    }
}

fn map_error(err: BollardError, reference: &str) -> ProviderError {
    match err {
        BollardError::DockerResponseServerError {
            status_code: 404, ..
        } => ProviderError::NotFound(reference.to_string()),
        other => ProviderError::Unavailable(other.to_string()),
    }
}

fn container_name(inspect: &ContainerInspectResponse) -> Option<String> {
    inspect
        .name
        .as_deref()
        .map(|name| name.trim_start_matches('/').to_string())
}

fn collect_ports(inspect: &ContainerInspectResponse) -> BTreeSet<u16> {
    let exposed = inspect
        .config
        .as_ref()
        .and_then(|config| config.exposed_ports.as_ref())
        .into_iter()
        .flat_map(|ports| ports.keys());

    let published = inspect
        .network_settings
        .as_ref()
        .and_then(|settings| settings.ports.as_ref())
        .into_iter()
        .flat_map(|ports| ports.keys());

    exposed
        .chain(published)
        .filter_map(|key| parse_port_key(key))
        .collect()
}

#[async_trait]
impl ContainerProvider for DockerProvider {
    async fn resolve(&self, reference: &str) -> Result<ContainerHandle, ProviderError> {
        let inspect = self.inspect(reference).await?;
        let id = inspect
            .id
            .clone()
            .ok_or_else(|| ProviderError::NotFound(reference.to_string()))?;
        let name = container_name(&inspect).unwrap_or_else(|| reference.to_string());
        debug!(container = %name, id = %id, "Resolved container");
        Ok(ContainerHandle::new(id, name))
    }

    async fn list_ports(&self, handle: &ContainerHandle) -> Result<BTreeSet<u16>, ProviderError> {
        let inspect = self.inspect(&handle.id).await?;
        Ok(collect_ports(&inspect))
    }

    async fn list_environment(
        &self,
        handle: &ContainerHandle,
    ) -> Result<Vec<String>, ProviderError> {
        let inspect = self.inspect(&handle.id).await?;
        Ok(inspect
            .config
            .and_then(|config| config.env)
            .unwrap_or_default())
    }

    async fn file_exists(
        &self,
        handle: &ContainerHandle,
        path: &str,
    ) -> Result<bool, ProviderError> {
        let operation = format!("exec test -f {}", path);
        self.bounded(&operation, async {
            let output = self
                .exec(&handle.id, vec!["test", "-f", path])
                .await
                .map_err(|e| ProviderError::Unreadable {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(output.exit_code == 0)
        })
        .await
    }

    async fn read_file(
        &self,
        handle: &ContainerHandle,
        path: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        let operation = format!("exec cat {}", path);
        self.bounded(&operation, async {
            let output = self
                .exec(&handle.id, vec!["cat", path])
                .await
                .map_err(|e| ProviderError::Unreadable {
                    path: path.to_string(),
                    reason: e.to_string(),
                })?;
            if output.exit_code != 0 {
                return Err(ProviderError::Unreadable {
                    path: path.to_string(),
                    reason: format!("cat exited with status {}", output.exit_code),
                });
            }
            Ok(output.stdout)
        })
        .await
    }

    async fn list_running(&self) -> Result<Vec<String>, ProviderError> {
        let containers = self
            .bounded("list containers", async {
                self.docker
                    .list_containers(Some(ListContainersOptions::<String> {
                        all: false,
                        ..Default::default()
                    }))
                    .await
                    .map_err(|e| ProviderError::Unavailable(e.to_string()))
            })
            .await?;

        Ok(containers
            .into_iter()
            .filter_map(|summary| summary.id)
            .collect())
    }

    fn name(&self) -> &str {
        "docker"
    }
}
