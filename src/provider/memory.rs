//! In-memory container provider for tests and offline runs

use super::{ContainerHandle, ContainerProvider, ProviderError};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

/// A canned container description
#[derive(Debug, Clone, Default)]
pub struct StaticContainer {
    pub id: String,
    pub name: String,
    pub ports: BTreeSet<u16>,
    pub env: Vec<String>,
    pub files: BTreeMap<String, Vec<u8>>,
    /// Paths that exist but fail to read
    pub unreadable: BTreeSet<String>,
    /// Every file probe fails
    pub filesystem_unavailable: bool,
    /// Port and environment reads fail
    pub metadata_unavailable: bool,
    pub running: bool,
}

impl StaticContainer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            running: true,
            ..Default::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.ports.insert(port);
        self
    }

    pub fn with_env(mut self, name: &str, value: &str) -> Self {
        self.env.push(format!("{}={}", name, value));
        self
    }

    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    pub fn with_unreadable_file(mut self, path: impl Into<String>) -> Self {
        self.unreadable.insert(path.into());
        self
    }

    pub fn with_unavailable_filesystem(mut self) -> Self {
        self.filesystem_unavailable = true;
        self
    }

    pub fn with_unavailable_metadata(mut self) -> Self {
        self.metadata_unavailable = true;
        self
    }

    pub fn stopped(mut self) -> Self {
        self.running = false;
        self
    }

    fn handle(&self) -> ContainerHandle {
        ContainerHandle::new(self.id.clone(), self.name.clone())
    }
}

/// Serves [`StaticContainer`]s from memory
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    containers: Vec<StaticContainer>,
    unreachable: bool,
    probe_delay: Option<Duration>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose every call fails as if the runtime were down.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Default::default()
        }
    }

    pub fn with_container(mut self, container: StaticContainer) -> Self {
        self.containers.push(container);
        self
    }

    /// Delays every file probe, for exercising timeouts.
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = Some(delay);
        self
    }

    fn check_reachable(&self) -> Result<(), ProviderError> {
        if self.unreachable {
            return Err(ProviderError::Unavailable(
                "static provider marked unreachable".to_string(),
            ));
        }
        Ok(())
    }

    fn lookup(&self, handle: &ContainerHandle) -> Result<&StaticContainer, ProviderError> {
        self.check_reachable()?;
        self.containers
            .iter()
            .find(|c| c.id == handle.id)
            .ok_or_else(|| ProviderError::NotFound(handle.id.clone()))
    }

    async fn delay(&self) {
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ContainerProvider for StaticProvider {
    async fn resolve(&self, reference: &str) -> Result<ContainerHandle, ProviderError> {
        self.check_reachable()?;
        self.containers
            .iter()
            .find(|c| c.id == reference || c.name == reference)
            .or_else(|| {
                let mut prefixed = self
                    .containers
                    .iter()
                    .filter(|c| !reference.is_empty() && c.id.starts_with(reference));
                match (prefixed.next(), prefixed.next()) {
                    (Some(only), None) => Some(only),
                    _ => None,
                }
            })
            .map(StaticContainer::handle)
            .ok_or_else(|| ProviderError::NotFound(reference.to_string()))
    }

    async fn list_ports(&self, handle: &ContainerHandle) -> Result<BTreeSet<u16>, ProviderError> {
        let container = self.lookup(handle)?;
        if container.metadata_unavailable {
            return Err(ProviderError::Unavailable("port table unreadable".to_string()));
        }
        Ok(container.ports.clone())
    }

    async fn list_environment(
        &self,
        handle: &ContainerHandle,
    ) -> Result<Vec<String>, ProviderError> {
        let container = self.lookup(handle)?;
        if container.metadata_unavailable {
            return Err(ProviderError::Unavailable("environment unreadable".to_string()));
        }
        Ok(container.env.clone())
    }

    async fn file_exists(
        &self,
        handle: &ContainerHandle,
        path: &str,
    ) -> Result<bool, ProviderError> {
        self.delay().await;
        let container = self.lookup(handle)?;
        if container.filesystem_unavailable {
            return Err(ProviderError::Unreadable {
                path: path.to_string(),
                reason: "exec failed".to_string(),
            });
        }
        Ok(container.files.contains_key(path) || container.unreadable.contains(path))
    }

    async fn read_file(
        &self,
        handle: &ContainerHandle,
        path: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        self.delay().await;
        let container = self.lookup(handle)?;
        if container.filesystem_unavailable || container.unreadable.contains(path) {
            return Err(ProviderError::Unreadable {
                path: path.to_string(),
                reason: "permission denied".to_string(),
            });
        }
        container
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| ProviderError::Unreadable {
                path: path.to_string(),
                reason: "no such file".to_string(),
            })
    }

    async fn list_running(&self) -> Result<Vec<String>, ProviderError> {
        self.check_reachable()?;
        Ok(self
            .containers
            .iter()
            .filter(|c| c.running)
            .map(|c| c.id.clone())
            .collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}
