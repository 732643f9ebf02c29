use super::EvidenceCollector;
use crate::detection::indicators::IndicatorTable;
use crate::detection::types::{Axis, Evidence};
use crate::provider::{ContainerHandle, ContainerProvider};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Matches exposed and published ports against the port table.
pub struct PortCollector {
    indicators: Arc<IndicatorTable>,
}

impl PortCollector {
    pub fn new(indicators: Arc<IndicatorTable>) -> Self {
        Self { indicators }
    }
}

#[async_trait]
impl EvidenceCollector for PortCollector {
    fn axis(&self) -> Axis {
        Axis::Port
    }

    async fn collect(
        &self,
        provider: &dyn ContainerProvider,
        handle: &ContainerHandle,
    ) -> Evidence {
        let ports = match provider.list_ports(handle).await {
            Ok(ports) => ports,
            Err(e) => {
                debug!(container = %handle.name, error = %e, "Port probe failed");
                return Evidence::new();
            }
        };

        let score = self.indicators.scores.port;
        let mut evidence = Evidence::new();
        for indicator in &self.indicators.ports {
            if ports.contains(&indicator.port) {
                debug!(port = indicator.port, framework = %indicator.framework, "Port matched");
                evidence.add(indicator.framework, score);
            }
        }
        evidence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{StaticContainer, StaticProvider};
    use crate::stack::FrameworkId;

    async fn collect(container: StaticContainer) -> Evidence {
        let provider = StaticProvider::new().with_container(container);
        let handle = provider.resolve("web").await.unwrap();
        PortCollector::new(Arc::new(IndicatorTable::builtin()))
            .collect(&provider, &handle)
            .await
    }

    #[tokio::test]
    async fn test_single_port_match() {
        let evidence = collect(StaticContainer::new("c1", "web").with_port(5000)).await;
        assert_eq!(evidence.len(), 1);
        assert!((evidence.score(FrameworkId::Flask) - 0.3).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_matches_accumulate_per_framework() {
        let evidence = collect(
            StaticContainer::new("c1", "web")
                .with_port(3000)
                .with_port(4000)
                .with_port(8000),
        )
        .await;
        assert!((evidence.score(FrameworkId::Express) - 0.6).abs() < 1e-12);
        assert!((evidence.score(FrameworkId::Django) - 0.3).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_unmapped_ports_are_ignored() {
        let evidence = collect(StaticContainer::new("c1", "web").with_port(22).with_port(443)).await;
        assert!(evidence.is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_ports_yield_empty_evidence() {
        let evidence = collect(
            StaticContainer::new("c1", "web")
                .with_port(5000)
                .with_unavailable_metadata(),
        )
        .await;
        assert!(evidence.is_empty());
    }
}
