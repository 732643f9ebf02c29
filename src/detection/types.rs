//! Evidence and result types

use crate::provider::ContainerHandle;
use crate::stack::{FrameworkId, LanguageId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Default threshold for [`is_confident`]
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// An inspection dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Port,
    Environment,
    Filesystem,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Filesystem, Axis::Environment, Axis::Port];

    /// Tie-break priority; higher wins.
    pub fn priority(self) -> u8 {
        match self {
            Axis::Filesystem => 3,
            Axis::Environment => 2,
            Axis::Port => 1,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Port => "port",
            Axis::Environment => "environment",
            Axis::Filesystem => "filesystem",
        };
        f.write_str(name)
    }
}

/// Raw per-framework contributions gathered by one collector
///
/// Only frameworks with a positive contribution are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Evidence {
    scores: BTreeMap<FrameworkId, f64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    versions: BTreeMap<FrameworkId, String>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `score` to `framework`. Non-positive or non-finite scores and the
    /// `Unknown` sentinel are ignored.
    pub fn add(&mut self, framework: FrameworkId, score: f64) {
        if framework.is_unknown() || !score.is_finite() || score <= 0.0 {
            return;
        }
        *self.scores.entry(framework).or_insert(0.0) += score;
    }

    pub fn with(mut self, framework: FrameworkId, score: f64) -> Self {
        self.add(framework, score);
        self
    }

    /// Records a version hint. The first hint for a framework is kept.
    pub fn record_version(&mut self, framework: FrameworkId, version: impl Into<String>) {
        self.versions.entry(framework).or_insert_with(|| version.into());
    }

    pub fn with_version(mut self, framework: FrameworkId, version: impl Into<String>) -> Self {
        self.record_version(framework, version);
        self
    }

    pub fn score(&self, framework: FrameworkId) -> f64 {
        self.scores.get(&framework).copied().unwrap_or(0.0)
    }

    pub fn version(&self, framework: FrameworkId) -> Option<&str> {
        self.versions.get(&framework).map(String::as_str)
    }

    pub fn scores(&self) -> &BTreeMap<FrameworkId, f64> {
        &self.scores
    }

    pub fn iter(&self) -> impl Iterator<Item = (FrameworkId, f64)> + '_ {
        self.scores.iter().map(|(framework, score)| (*framework, *score))
    }

    pub fn contains(&self, framework: FrameworkId) -> bool {
        self.scores.contains_key(&framework)
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }
}

/// Combiner output
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub framework: FrameworkId,
    pub language: LanguageId,
    pub confidence: f64,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            framework: FrameworkId::Unknown,
            language: LanguageId::Unknown,
            confidence: 0.0,
        }
    }
}

/// The raw evidence behind a result, kept for auditing
///
/// `aggregates` holds the weighted sum per framework, so a reader can see how
/// the winner's confidence was reached and how close the runners-up came.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionMetadata {
    port: Evidence,
    environment: Evidence,
    filesystem: Evidence,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    aggregates: BTreeMap<FrameworkId, f64>,
}

impl DetectionMetadata {
    pub fn new(port: Evidence, environment: Evidence, filesystem: Evidence) -> Self {
        Self {
            port,
            environment,
            filesystem,
            aggregates: BTreeMap::new(),
        }
    }

    pub fn with_aggregates(mut self, aggregates: BTreeMap<FrameworkId, f64>) -> Self {
        self.aggregates = aggregates;
        self
    }

    pub fn aggregates(&self) -> &BTreeMap<FrameworkId, f64> {
        &self.aggregates
    }

    /// Weighted aggregates ordered from strongest to weakest, ties by id.
    pub fn ranked_aggregates(&self) -> Vec<(FrameworkId, f64)> {
        let mut ranked: Vec<(FrameworkId, f64)> =
            self.aggregates.iter().map(|(f, score)| (*f, *score)).collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id().cmp(b.0.id()))
        });
        ranked
    }

    pub fn evidence(&self, axis: Axis) -> &Evidence {
        match axis {
            Axis::Port => &self.port,
            Axis::Environment => &self.environment,
            Axis::Filesystem => &self.filesystem,
        }
    }
}

/// Classification of one container at one point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResult {
    container_id: String,
    container_name: String,
    framework: FrameworkId,
    language: LanguageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    confidence: f64,
    detected_at: DateTime<Utc>,
    metadata: DetectionMetadata,
}

impl DetectionResult {
    pub(crate) fn new(
        handle: &ContainerHandle,
        classification: Classification,
        version: Option<String>,
        metadata: DetectionMetadata,
    ) -> Self {
        Self {
            container_id: handle.id.clone(),
            container_name: handle.name.clone(),
            framework: classification.framework,
            language: classification.language,
            version,
            confidence: classification.confidence,
            detected_at: Utc::now(),
            metadata,
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn framework(&self) -> FrameworkId {
        self.framework
    }

    pub fn language(&self) -> LanguageId {
        self.language
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }

    pub fn metadata(&self) -> &DetectionMetadata {
        &self.metadata
    }

    pub fn is_confident(&self, threshold: f64) -> bool {
        is_confident(self, threshold)
    }
}

/// Whether a result meets a confidence threshold.
pub fn is_confident(result: &DetectionResult, threshold: f64) -> bool {
    result.confidence >= threshold
}
