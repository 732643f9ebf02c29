//! Framework detection engine
//!
//! - [`indicators`]: port, environment, and manifest signal tables
//! - [`collectors`]: one evidence collector per inspection axis
//! - [`combiner`]: weighted fusion of the three evidence maps
//! - [`detector`]: the orchestrator exposing `detect`, `detect_all`, and `list_indicators`
//! - [`types`]: evidence and result types

pub mod collectors;
pub mod combiner;
pub mod detector;
pub mod indicators;
pub mod types;

pub use collectors::{EnvironmentCollector, EvidenceCollector, FilesystemCollector, PortCollector};
pub use combiner::{EvidenceCombiner, Weights, WeightsError};
pub use detector::{BatchEntry, BatchReport, DetectionError, FrameworkDetector};
pub use indicators::{IndicatorError, IndicatorSnapshot, IndicatorTable, SignalScores};
pub use types::{
    is_confident, Axis, Classification, DetectionMetadata, DetectionResult, Evidence,
    DEFAULT_CONFIDENCE_THRESHOLD,
};
