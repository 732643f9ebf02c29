//! Detection orchestration
//!
//! [`FrameworkDetector`] ties the pieces together:
//!
//! 1. Resolves the container reference through the provider
//! 2. Runs the port, environment, and filesystem collectors concurrently,
//!    each bounded by the collector timeout
//! 3. Fuses the three evidence maps with the [`EvidenceCombiner`]
//! 4. Returns an immutable [`DetectionResult`] carrying the raw evidence
//!
//! A collector that fails or times out contributes empty evidence; only
//! resolution failures surface as errors.
//!
//! # Example
//!
//! ```no_run
//! use stackscout::detection::FrameworkDetector;
//! use stackscout::provider::DockerProvider;
//! use stackscout::StackscoutConfig;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StackscoutConfig::default();
//! let provider = Arc::new(DockerProvider::connect(config.probe_timeout())?);
//! let detector = FrameworkDetector::from_config(provider, &config)?;
//!
//! let result = detector.detect("my-app").await?;
//! println!("{} ({:.0}%)", result.framework(), result.confidence() * 100.0);
//! # Ok(())
//! # }
//! ```

use super::collectors::{
    EnvironmentCollector, EvidenceCollector, FilesystemCollector, PortCollector,
};
use super::combiner::{EvidenceCombiner, Weights};
use super::indicators::{IndicatorSnapshot, IndicatorTable};
use super::types::{Axis, DetectionMetadata, DetectionResult, Evidence};
use crate::config::{ConfigError, StackscoutConfig};
use crate::provider::{ContainerHandle, ContainerProvider, ProviderError};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};

pub const DEFAULT_COLLECTOR_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum DetectionError {
    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    #[error("Detection failed: {0}")]
    DetectionFailure(String),
}

impl From<ProviderError> for DetectionError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(reference) => DetectionError::ContainerNotFound(reference),
            other => DetectionError::DetectionFailure(other.to_string()),
        }
    }
}

/// Outcome for one container of a batch run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub reference: String,
    pub outcome: Result<DetectionResult, DetectionError>,
}

impl BatchEntry {
    pub fn result(&self) -> Option<&DetectionResult> {
        self.outcome.as_ref().ok()
    }
}

/// Serializable view of a [`BatchEntry`]
#[derive(Debug, Serialize)]
pub struct BatchReport<'a> {
    pub reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<&'a DetectionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'a> From<&'a BatchEntry> for BatchReport<'a> {
    fn from(entry: &'a BatchEntry) -> Self {
        Self {
            reference: &entry.reference,
            result: entry.outcome.as_ref().ok(),
            error: entry.outcome.as_ref().err().map(ToString::to_string),
        }
    }
}

pub struct FrameworkDetector {
    provider: Arc<dyn ContainerProvider>,
    indicators: Arc<IndicatorTable>,
    combiner: EvidenceCombiner,
    collectors: BTreeMap<Axis, Box<dyn EvidenceCollector>>,
    collector_timeout: Duration,
    max_concurrency: usize,
}

impl FrameworkDetector {
    /// Detector with the default weights and one table-driven collector per axis.
    pub fn new(provider: Arc<dyn ContainerProvider>, indicators: IndicatorTable) -> Self {
        let indicators = Arc::new(indicators);

        let defaults: [Box<dyn EvidenceCollector>; 3] = [
            Box::new(PortCollector::new(Arc::clone(&indicators))),
            Box::new(EnvironmentCollector::new(Arc::clone(&indicators))),
            Box::new(FilesystemCollector::new(Arc::clone(&indicators))),
        ];
        let collectors = defaults
            .into_iter()
            .map(|collector| (collector.axis(), collector))
            .collect();

        Self {
            provider,
            indicators,
            combiner: EvidenceCombiner::default(),
            collectors,
            collector_timeout: DEFAULT_COLLECTOR_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    pub fn from_config(
        provider: Arc<dyn ContainerProvider>,
        config: &StackscoutConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let indicators = config.load_indicators()?;

        Ok(Self::new(provider, indicators)
            .with_weights(config.weights)
            .with_collector_timeout(config.collector_timeout())
            .with_max_concurrency(config.max_concurrency))
    }

    pub fn with_weights(mut self, weights: Weights) -> Self {
        self.combiner = EvidenceCombiner::new(weights);
        self
    }

    /// Replaces the collector for the axis it reports.
    pub fn with_collector(mut self, collector: Box<dyn EvidenceCollector>) -> Self {
        self.collectors.insert(collector.axis(), collector);
        self
    }

    pub fn with_collector_timeout(mut self, collector_timeout: Duration) -> Self {
        self.collector_timeout = collector_timeout;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn indicators(&self) -> &IndicatorTable {
        &self.indicators
    }

    pub fn weights(&self) -> Weights {
        self.combiner.weights()
    }

    async fn run_collector(&self, axis: Axis, handle: &ContainerHandle) -> Evidence {
        let Some(collector) = self.collectors.get(&axis) else {
            return Evidence::new();
        };

        match timeout(
            self.collector_timeout,
            collector.collect(self.provider.as_ref(), handle),
        )
        .await
        {
            Ok(evidence) => {
                debug!(container = %handle.name, axis = %axis, matches = evidence.len(), "Collector finished");
                evidence
            }
            Err(_) => {
                warn!(
                    container = %handle.name,
                    axis = %axis,
                    timeout_secs = self.collector_timeout.as_secs_f64(),
                    "Collector timed out, ignoring its evidence"
                );
                Evidence::new()
            }
        }
    }

    /// Classifies one container by id, id prefix, or name.
    pub async fn detect(&self, reference: &str) -> Result<DetectionResult, DetectionError> {
        let started = Instant::now();
        let handle = self.provider.resolve(reference).await?;

        let (port, environment, filesystem) = tokio::join!(
            self.run_collector(Axis::Port, &handle),
            self.run_collector(Axis::Environment, &handle),
            self.run_collector(Axis::Filesystem, &handle),
        );

        let classification = self.combiner.combine(&port, &environment, &filesystem);
        let aggregates = self.combiner.aggregate(&port, &environment, &filesystem);
        let version = filesystem
            .version(classification.framework)
            .map(str::to_string);

        info!(
            container = %handle.name,
            framework = %classification.framework,
            confidence = classification.confidence,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Detection complete"
        );

        Ok(DetectionResult::new(
            &handle,
            classification,
            version,
            DetectionMetadata::new(port, environment, filesystem).with_aggregates(aggregates),
        ))
    }

    /// Classifies every running container, in listing order.
    pub async fn detect_all(&self) -> Result<Vec<BatchEntry>, DetectionError> {
        let references = self
            .provider
            .list_running()
            .await
            .map_err(|e| DetectionError::DetectionFailure(e.to_string()))?;

        info!(containers = references.len(), provider = self.provider.name(), "Detecting all running containers");

        let entries: Vec<BatchEntry> = stream::iter(references)
            .map(|reference| async move {
                let outcome = self.detect(&reference).await;
                if let Err(e) = &outcome {
                    warn!(container = %reference, error = %e, "Detection failed");
                }
                BatchEntry { reference, outcome }
            })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        Ok(entries)
    }

    /// The tables, weights, and framework catalog in effect.
    pub fn list_indicators(&self) -> IndicatorSnapshot {
        IndicatorSnapshot::new(&self.indicators, self.combiner.weights())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{StaticContainer, StaticProvider};
    use crate::stack::FrameworkId;
    use async_trait::async_trait;

    struct SlowCollector;

    #[async_trait]
    impl EvidenceCollector for SlowCollector {
        fn axis(&self) -> Axis {
            Axis::Port
        }

        async fn collect(&self, _: &dyn ContainerProvider, _: &ContainerHandle) -> Evidence {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Evidence::new().with(FrameworkId::Gin, 10.0)
        }
    }

    fn detector(provider: StaticProvider) -> FrameworkDetector {
        FrameworkDetector::new(Arc::new(provider), IndicatorTable::builtin())
    }

    #[tokio::test]
    async fn test_missing_container() {
        let detector = detector(StaticProvider::new());
        assert_eq!(
            detector.detect("ghost").await,
            Err(DetectionError::ContainerNotFound("ghost".to_string()))
        );
    }

    #[tokio::test]
    async fn test_unreachable_runtime_is_detection_failure() {
        let detector = detector(StaticProvider::unreachable());
        assert!(matches!(
            detector.detect("web").await,
            Err(DetectionError::DetectionFailure(_))
        ));
        assert!(matches!(
            detector.detect_all().await,
            Err(DetectionError::DetectionFailure(_))
        ));
    }

    #[tokio::test]
    async fn test_version_comes_from_winner() {
        let provider = StaticProvider::new().with_container(
            StaticContainer::new("c1", "web")
                .with_port(5000)
                .with_file("requirements.txt", "flask==3.0.0\n"),
        );
        let result = detector(provider).detect("web").await.unwrap();
        assert_eq!(result.framework(), FrameworkId::Flask);
        assert_eq!(result.version(), Some("3.0.0"));
        assert_eq!(result.container_id(), "c1");
    }

    #[tokio::test]
    async fn test_collector_timeout_drops_evidence() {
        let provider = StaticProvider::new()
            .with_container(StaticContainer::new("c1", "web").with_env("GIN_MODE", "release"));
        let detector = detector(provider)
            .with_collector(Box::new(SlowCollector))
            .with_collector_timeout(Duration::from_millis(50));

        let result = detector.detect("web").await.unwrap();
        assert_eq!(result.framework(), FrameworkId::Gin);
        assert!(result.metadata().evidence(Axis::Port).is_empty());
        assert!((result.confidence() - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_batch_report_view() {
        let entry = BatchEntry {
            reference: "ghost".to_string(),
            outcome: Err(DetectionError::ContainerNotFound("ghost".to_string())),
        };
        let json = serde_json::to_value(BatchReport::from(&entry)).unwrap();
        assert_eq!(json["reference"], "ghost");
        assert_eq!(json["error"], "Container not found: ghost");
        assert!(json.get("result").is_none());
        assert!(entry.result().is_none());
    }
}
