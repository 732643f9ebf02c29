//! stackscout - framework and language detection for running containers
//!
//! stackscout classifies the application framework inside a running container
//! without touching the application. Three independent collectors gather
//! evidence and a weighted combiner fuses it into one classification with an
//! auditable confidence score.
//!
//! # Core Concepts
//!
//! - **Evidence**: per-framework raw scores from one inspection axis (ports,
//!   environment variable names, or dependency manifests)
//! - **Indicator tables**: the data that maps ports, variable names, and
//!   manifest contents to frameworks; built in or loaded from a file
//! - **Providers**: read-only access to a container, through Docker or an
//!   in-memory fake
//!
//! # Example Usage
//!
//! ```no_run
//! use stackscout::detection::{FrameworkDetector, IndicatorTable};
//! use stackscout::provider::{StaticContainer, StaticProvider};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = StaticProvider::new().with_container(
//!     StaticContainer::new("3f2a1b9c0d4e", "web")
//!         .with_port(5000)
//!         .with_file("requirements.txt", "flask==3.0.0\n"),
//! );
//! let detector = FrameworkDetector::new(Arc::new(provider), IndicatorTable::builtin());
//!
//! let result = detector.detect("web").await?;
//! println!("{} {:?} {:.2}", result.framework(), result.version(), result.confidence());
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`detection`]: collectors, combiner, indicator tables, and the orchestrator
//! - [`provider`]: container introspection backends
//! - [`stack`]: framework and language identifiers
//! - [`config`]: environment-driven configuration
//! - [`cli`]: the `stackscout` command-line front end

pub mod cli;
pub mod config;
pub mod detection;
pub mod provider;
pub mod stack;
pub mod util;

pub use config::{ConfigError, StackscoutConfig};
pub use detection::{
    is_confident, BatchEntry, DetectionError, DetectionResult, Evidence, FrameworkDetector,
    IndicatorSnapshot, IndicatorTable, Weights, DEFAULT_CONFIDENCE_THRESHOLD,
};
pub use provider::{ContainerHandle, ContainerProvider, DockerProvider, ProviderError};
pub use stack::{FrameworkId, LanguageId};
pub use util::{init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_stackscout() {
        assert_eq!(NAME, "stackscout");
    }
}
