use super::EvidenceCollector;
use crate::detection::indicators::{FileIndicator, IndicatorTable};
use crate::detection::types::{Axis, Evidence};
use crate::provider::{ContainerHandle, ContainerProvider, ProviderError};
use crate::stack::FrameworkId;
use async_trait::async_trait;
use futures_util::future::join_all;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, warn};

/// A manifest hit: the framework plus an optional captured version.
type ManifestHit = (FrameworkId, Option<String>);

/// Probes dependency manifests and matches their contents against the file table.
///
/// Every manifest is probed concurrently and independently; a failure on one
/// file never affects the others.
pub struct FilesystemCollector {
    indicators: Arc<IndicatorTable>,
    /// Compiled version patterns, indexed like `indicators.files[i].matches[j]`
    patterns: Vec<Vec<Option<Regex>>>,
}

impl FilesystemCollector {
    pub fn new(indicators: Arc<IndicatorTable>) -> Self {
        let patterns = indicators
            .files
            .iter()
            .map(|file| {
                file.matches
                    .iter()
                    .map(|matcher| {
                        let pattern = matcher.version_pattern.as_deref()?;
                        match Regex::new(pattern) {
                            Ok(re) => Some(re),
                            Err(e) => {
                                warn!(path = %file.path, error = %e, "Ignoring invalid version pattern");
                                None
                            }
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            indicators,
            patterns,
        }
    }

    async fn probe(
        &self,
        provider: &dyn ContainerProvider,
        handle: &ContainerHandle,
        index: usize,
        file: &FileIndicator,
    ) -> Result<Vec<ManifestHit>, ProviderError> {
        if !provider.file_exists(handle, &file.path).await? {
            return Ok(Vec::new());
        }

        let bytes = provider.read_file(handle, &file.path).await?;
        let text = String::from_utf8_lossy(&bytes);
        let haystack = text.to_lowercase();

        let hits = file
            .matches
            .iter()
            .zip(&self.patterns[index])
            .filter(|(matcher, _)| haystack.contains(&matcher.contains.to_lowercase()))
            .map(|(matcher, pattern)| {
                let version = pattern
                    .as_ref()
                    .and_then(|re| re.captures(&text))
                    .and_then(|captures| captures.get(1))
                    .map(|m| m.as_str().to_string());
                debug!(path = %file.path, framework = %matcher.framework, version = ?version, "Manifest matched");
                (matcher.framework, version)
            })
            .collect();

        Ok(hits)
    }
}

#[async_trait]
impl EvidenceCollector for FilesystemCollector {
    fn axis(&self) -> Axis {
        Axis::Filesystem
    }

    async fn collect(
        &self,
        provider: &dyn ContainerProvider,
        handle: &ContainerHandle,
    ) -> Evidence {
        let probes = self
            .indicators
            .files
            .iter()
            .enumerate()
            .map(|(index, file)| self.probe(provider, handle, index, file));
        let outcomes = join_all(probes).await;

        let score = self.indicators.scores.filesystem;
        let mut evidence = Evidence::new();

        // Table order, so the first manifest to yield a version wins.
        for (file, outcome) in self.indicators.files.iter().zip(outcomes) {
            match outcome {
                Ok(hits) => {
                    for (framework, version) in hits {
                        evidence.add(framework, score);
                        if let Some(version) = version {
                            evidence.record_version(framework, version);
                        }
                    }
                }
                Err(e) => {
                    debug!(container = %handle.name, path = %file.path, error = %e, "File probe failed");
                }
            }
        }

        evidence
    }
}
