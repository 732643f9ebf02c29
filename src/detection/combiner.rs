//! Weighted evidence fusion
//!
//! ```text
//! aggregate[f] = Σ_axis raw[axis][f] * weight[axis]
//! ```
//!
//! Axes where a framework is absent contribute nothing. The highest aggregate
//! wins; ties are broken by the axis that supplied the candidate's strongest
//! weighted contribution (filesystem, then environment, then port) and then by
//! framework id, so the outcome never depends on map iteration order.

use super::types::{Axis, Classification, Evidence};
use crate::stack::FrameworkId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use thiserror::Error;

/// Aggregates closer than this are treated as equal.
const TIE_EPSILON: f64 = 1e-9;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeightsError {
    #[error("{axis} weight must be a non-negative number, got {value}")]
    Invalid { axis: Axis, value: f64 },

    #[error("weights must sum to 1.0, got {0}")]
    BadSum(f64),
}

/// Per-axis weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub filesystem: f64,
    pub environment: f64,
    pub port: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            filesystem: 0.5,
            environment: 0.3,
            port: 0.2,
        }
    }
}

impl Weights {
    pub fn new(filesystem: f64, environment: f64, port: f64) -> Result<Self, WeightsError> {
        let weights = Self {
            filesystem,
            environment,
            port,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), WeightsError> {
        for axis in Axis::ALL {
            let value = self.for_axis(axis);
            if !value.is_finite() || value < 0.0 {
                return Err(WeightsError::Invalid { axis, value });
            }
        }

        let sum = self.filesystem + self.environment + self.port;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightsError::BadSum(sum));
        }
        Ok(())
    }

    pub fn for_axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Filesystem => self.filesystem,
            Axis::Environment => self.environment,
            Axis::Port => self.port,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    framework: FrameworkId,
    aggregate: f64,
    strongest_axis: Axis,
    strongest_contribution: f64,
}

/// Ordering where `Less` means `a` ranks ahead of `b`.
fn rank(a: &Candidate, b: &Candidate) -> Ordering {
    if (a.aggregate - b.aggregate).abs() > TIE_EPSILON {
        return b
            .aggregate
            .partial_cmp(&a.aggregate)
            .unwrap_or(Ordering::Equal);
    }

    b.strongest_axis
        .priority()
        .cmp(&a.strongest_axis.priority())
        .then_with(|| a.framework.id().cmp(b.framework.id()))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EvidenceCombiner {
    weights: Weights,
}

impl EvidenceCombiner {
    pub fn new(weights: Weights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> Weights {
        self.weights
    }

    fn candidates(
        &self,
        port: &Evidence,
        environment: &Evidence,
        filesystem: &Evidence,
    ) -> BTreeMap<FrameworkId, Candidate> {
        let mut candidates: BTreeMap<FrameworkId, Candidate> = BTreeMap::new();

        // Highest-priority axis first so an equal contribution keeps the earlier axis.
        for (axis, evidence) in [
            (Axis::Filesystem, filesystem),
            (Axis::Environment, environment),
            (Axis::Port, port),
        ] {
            let weight = self.weights.for_axis(axis);
            for (framework, raw) in evidence.iter() {
                let contribution = raw * weight;
                let candidate = candidates.entry(framework).or_insert(Candidate {
                    framework,
                    aggregate: 0.0,
                    strongest_axis: axis,
                    strongest_contribution: contribution,
                });
                candidate.aggregate += contribution;
                if contribution > candidate.strongest_contribution + TIE_EPSILON {
                    candidate.strongest_axis = axis;
                    candidate.strongest_contribution = contribution;
                }
            }
        }

        candidates
    }

    /// Weighted aggregate per framework, unclamped. Recorded in the result metadata.
    pub fn aggregate(
        &self,
        port: &Evidence,
        environment: &Evidence,
        filesystem: &Evidence,
    ) -> BTreeMap<FrameworkId, f64> {
        self.candidates(port, environment, filesystem)
            .into_iter()
            .map(|(framework, candidate)| (framework, candidate.aggregate))
            .collect()
    }

    pub fn combine(
        &self,
        port: &Evidence,
        environment: &Evidence,
        filesystem: &Evidence,
    ) -> Classification {
        let winner = self
            .candidates(port, environment, filesystem)
            .into_values()
            .filter(|candidate| candidate.aggregate > 0.0)
            .min_by(rank);

        match winner {
            Some(candidate) => Classification {
                framework: candidate.framework,
                language: candidate.framework.language(),
                confidence: candidate.aggregate.clamp(0.0, 1.0),
            },
            None => Classification::unknown(),
        }
    }
}
