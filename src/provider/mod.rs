//! Container introspection providers
//!
//! The detection engine never talks to a container runtime directly. Everything
//! it needs from a container goes through [`ContainerProvider`], which keeps the
//! collectors testable without a Docker daemon.
//!
//! - [`DockerProvider`] inspects and execs into containers through the Docker API
//! - [`StaticProvider`] serves canned containers from memory

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;
use thiserror::Error;

pub mod docker;
pub mod memory;

pub use docker::DockerProvider;
pub use memory::{StaticContainer, StaticProvider};

/// A resolved container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerHandle {
    pub id: String,
    pub name: String,
}

impl ContainerHandle {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// First 12 characters of a container id, as the Docker CLI prints it.
pub fn short_id(id: &str) -> &str {
    let end = id
        .char_indices()
        .nth(12)
        .map(|(i, _)| i)
        .unwrap_or(id.len());
    &id[..end]
}

/// Errors raised by a provider call
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("Container not found: {0}")]
    NotFound(String),

    #[error("Cannot read {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Container runtime unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to a container's ports, environment, and files
#[async_trait]
pub trait ContainerProvider: Send + Sync {
    /// Resolve an id, id prefix, or name to a handle.
    async fn resolve(&self, reference: &str) -> Result<ContainerHandle, ProviderError>;

    /// Exposed and published container-side ports.
    async fn list_ports(&self, handle: &ContainerHandle) -> Result<BTreeSet<u16>, ProviderError>;

    /// Declared environment as `NAME=VALUE` entries.
    async fn list_environment(&self, handle: &ContainerHandle)
        -> Result<Vec<String>, ProviderError>;

    async fn file_exists(&self, handle: &ContainerHandle, path: &str)
        -> Result<bool, ProviderError>;

    async fn read_file(&self, handle: &ContainerHandle, path: &str)
        -> Result<Vec<u8>, ProviderError>;

    /// References of every running container.
    async fn list_running(&self) -> Result<Vec<String>, ProviderError>;

    fn name(&self) -> &str;
}

/// Parses a Docker port key such as `"5000/tcp"` into the port number.
pub fn parse_port_key(key: &str) -> Option<u16> {
    key.split('/').next()?.trim().parse().ok()
}
