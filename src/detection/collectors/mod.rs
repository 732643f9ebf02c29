//! Evidence collectors, one per inspection axis

use super::types::{Axis, Evidence};
use crate::provider::{ContainerHandle, ContainerProvider};
use async_trait::async_trait;

pub mod environment;
pub mod filesystem;
pub mod port;

pub use environment::EnvironmentCollector;
pub use filesystem::FilesystemCollector;
pub use port::PortCollector;

/// Gathers raw evidence for one axis
///
/// Collectors are best-effort: a provider failure is logged and yields empty
/// (or partial) evidence instead of an error.
#[async_trait]
pub trait EvidenceCollector: Send + Sync {
    fn axis(&self) -> Axis;

    async fn collect(&self, provider: &dyn ContainerProvider, handle: &ContainerHandle)
        -> Evidence;
}
