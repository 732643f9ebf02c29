//! Output formatting for detection results
//!
//! JSON and YAML serialize the result types directly. The human format renders
//! a short report with a confidence bar, the per-axis evidence, and the
//! weighted score of every candidate framework.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;

use crate::detection::detector::{BatchEntry, BatchReport};
use crate::detection::indicators::IndicatorSnapshot;
use crate::detection::types::{Axis, DetectionMetadata, DetectionResult, Evidence};
use crate::provider::short_id;

const RULE_WIDTH: usize = 42;
const BAR_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

/// A result together with its verdict against the threshold in effect
#[derive(Debug, Serialize)]
struct DetectionReport<'a> {
    #[serde(flatten)]
    result: &'a DetectionResult,
    confident: bool,
}

#[derive(Debug, Serialize)]
struct BatchOutput<'a> {
    threshold: f64,
    containers: Vec<BatchReport<'a>>,
}

pub struct OutputFormatter {
    format: OutputFormat,
    threshold: f64,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, threshold: f64) -> Self {
        Self { format, threshold }
    }

    pub fn format(&self, result: &DetectionResult) -> Result<String> {
        let report = DetectionReport {
            result,
            confident: result.is_confident(self.threshold),
        };
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&report)
                .context("Failed to serialize detection result to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(&report)
                .context("Failed to serialize detection result to YAML"),
            OutputFormat::Human => Ok(self.format_human(result)),
        }
    }

    pub fn format_batch(&self, entries: &[BatchEntry]) -> Result<String> {
        let output = BatchOutput {
            threshold: self.threshold,
            containers: entries.iter().map(BatchReport::from).collect(),
        };
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&output)
                .context("Failed to serialize batch results to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(&output)
                .context("Failed to serialize batch results to YAML"),
            OutputFormat::Human => Ok(self.format_batch_human(entries)),
        }
    }

    pub fn format_indicators(&self, snapshot: &IndicatorSnapshot) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(snapshot)
                .context("Failed to serialize indicators to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(snapshot).context("Failed to serialize indicators to YAML")
            }
            OutputFormat::Human => Ok(format_indicators_human(snapshot)),
        }
    }

    fn format_human(&self, result: &DetectionResult) -> String {
        let mut output = String::new();

        if result.is_confident(self.threshold) {
            output.push_str("\u{2713} Framework Detection Result\n");
        } else {
            output.push_str("\u{26A0} Framework Detection Result (Low Confidence)\n");
        }
        output.push_str(&rule());
        output.push_str("\n\n");

        let _ = writeln!(
            output,
            "Container:   {} ({})",
            result.container_name(),
            short_id(result.container_id())
        );
        match result.version() {
            Some(version) => {
                let _ = writeln!(output, "Framework:   {} {}", result.framework(), version);
            }
            None => {
                let _ = writeln!(output, "Framework:   {}", result.framework());
            }
        }
        let _ = writeln!(output, "Language:    {}\n", result.language());

        let _ = writeln!(
            output,
            "Confidence: {} {}% (threshold {}%)\n",
            confidence_bar(result.confidence()),
            percent(result.confidence()),
            percent(self.threshold)
        );

        output.push_str("Evidence:\n");
        for (i, axis) in Axis::ALL.iter().enumerate() {
            let connector = if i == Axis::ALL.len() - 1 {
                "\u{2514}\u{2500}"
            } else {
                "\u{251C}\u{2500}"
            };
            let _ = writeln!(
                output,
                "{} {:<12} {}",
                connector,
                format!("{}:", axis),
                describe_evidence(result.metadata().evidence(*axis))
            );
        }

        let _ = writeln!(
            output,
            "\nWeighted:    {}",
            describe_aggregates(result.metadata())
        );

        let _ = writeln!(
            output,
            "\nDetected at {}",
            result.detected_at().format("%Y-%m-%d %H:%M:%S UTC")
        );

        output
    }

    fn format_batch_human(&self, entries: &[BatchEntry]) -> String {
        if entries.is_empty() {
            return "No running containers\n".to_string();
        }

        let mut output = String::new();
        let _ = writeln!(
            output,
            "{:<24} {:<14} {:<10} {:<10} {:>6}",
            "CONTAINER", "FRAMEWORK", "LANGUAGE", "VERSION", "CONF"
        );

        let mut confident = 0;
        let mut failed = 0;
        for entry in entries {
            match &entry.outcome {
                Ok(result) => {
                    let marker = if result.is_confident(self.threshold) {
                        confident += 1;
                        "\u{2713}"
                    } else {
                        "\u{26A0}"
                    };
                    let _ = writeln!(
                        output,
                        "{:<24} {:<14} {:<10} {:<10} {:>5}% {}",
                        truncate(result.container_name(), 24),
                        result.framework().name(),
                        result.language().name(),
                        truncate(result.version().unwrap_or("N/A"), 10),
                        percent(result.confidence()),
                        marker
                    );
                }
                Err(e) => {
                    failed += 1;
                    let _ = writeln!(
                        output,
                        "{:<24} \u{2717} {}",
                        truncate(&entry.reference, 24),
                        e
                    );
                }
            }
        }

        let _ = writeln!(output, "\nSummary:");
        let _ = writeln!(output, "  Scanned:          {}", entries.len());
        let _ = writeln!(output, "  Confident:        {}", confident);
        let _ = writeln!(
            output,
            "  Low confidence:   {}",
            entries.len() - confident - failed
        );
        if failed > 0 {
            let _ = writeln!(output, "  Failed:           {}", failed);
        }

        output
    }
}

fn rule() -> String {
    "\u{2501}".repeat(RULE_WIDTH)
}

fn percent(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 100.0).round() as u8
}

fn confidence_bar(confidence: f64) -> String {
    let filled = ((confidence.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    "\u{2588}".repeat(filled) + &"\u{2591}".repeat(BAR_WIDTH - filled)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}\u{2026}", kept)
}

fn describe_evidence(evidence: &Evidence) -> String {
    if evidence.is_empty() {
        return "(none)".to_string();
    }
    evidence
        .iter()
        .map(|(framework, score)| match evidence.version(framework) {
            Some(version) => format!("{} {:.2} (v{})", framework.id(), score, version),
            None => format!("{} {:.2}", framework.id(), score),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_aggregates(metadata: &DetectionMetadata) -> String {
    let ranked = metadata.ranked_aggregates();
    if ranked.is_empty() {
        return "(none)".to_string();
    }
    ranked
        .iter()
        .map(|(framework, score)| format!("{} {:.2}", framework.id(), score))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_indicators_human(snapshot: &IndicatorSnapshot) -> String {
    let mut output = String::new();

    output.push_str("Detection Indicators\n");
    output.push_str(&rule());
    output.push_str("\n\n");

    let _ = writeln!(
        output,
        "Weights:  filesystem {:.2}  environment {:.2}  port {:.2}",
        snapshot.weights.filesystem, snapshot.weights.environment, snapshot.weights.port
    );
    let _ = writeln!(
        output,
        "Scores:   filesystem {:.2}  environment {:.2}  port {:.2}\n",
        snapshot.scores.filesystem, snapshot.scores.environment, snapshot.scores.port
    );

    output.push_str("Ports:\n");
    for indicator in &snapshot.ports {
        let _ = writeln!(output, "  {:<6} {}", indicator.port, indicator.framework.name());
    }

    output.push_str("\nEnvironment:\n");
    for indicator in &snapshot.environment {
        let _ = writeln!(output, "  {:<24} {}", indicator.name, indicator.framework.name());
    }

    output.push_str("\nManifests:\n");
    for file in &snapshot.files {
        let _ = writeln!(output, "  {}", file.path);
        for matcher in &file.matches {
            let _ = writeln!(
                output,
                "    {:<28} {}",
                matcher.contains,
                matcher.framework.name()
            );
        }
    }

    output.push_str("\nFrameworks:\n");
    for framework in &snapshot.frameworks {
        let _ = writeln!(
            output,
            "  {:<12} {:<8} {}",
            framework.name,
            framework.language.name(),
            framework.description
        );
    }

    output
}
