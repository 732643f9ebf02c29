use super::EvidenceCollector;
use crate::detection::indicators::IndicatorTable;
use crate::detection::types::{Axis, Evidence};
use crate::provider::{ContainerHandle, ContainerProvider};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Matches declared environment variable names against the environment table.
///
/// Names compare case-sensitively and values are never inspected.
pub struct EnvironmentCollector {
    indicators: Arc<IndicatorTable>,
}

impl EnvironmentCollector {
    pub fn new(indicators: Arc<IndicatorTable>) -> Self {
        Self { indicators }
    }
}

/// Variable name of a `NAME=VALUE` entry; a bare entry is all name.
fn variable_name(entry: &str) -> &str {
    entry.split_once('=').map_or(entry, |(name, _)| name)
}

#[async_trait]
impl EvidenceCollector for EnvironmentCollector {
    fn axis(&self) -> Axis {
        Axis::Environment
    }

    async fn collect(
        &self,
        provider: &dyn ContainerProvider,
        handle: &ContainerHandle,
    ) -> Evidence {
        let entries = match provider.list_environment(handle).await {
            Ok(entries) => entries,
            Err(e) => {
                debug!(container = %handle.name, error = %e, "Environment probe failed");
                return Evidence::new();
            }
        };

        let declared: BTreeSet<&str> = entries.iter().map(|e| variable_name(e)).collect();
        let score = self.indicators.scores.environment;

        let mut evidence = Evidence::new();
        for indicator in &self.indicators.environment {
            if declared.contains(indicator.name.as_str()) {
                debug!(variable = %indicator.name, framework = %indicator.framework, "Environment variable matched");
                evidence.add(indicator.framework, score);
            }
        }
        evidence
    }
}
