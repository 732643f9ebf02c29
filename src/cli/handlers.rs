//! Command handlers
//!
//! Each handler returns the process exit code: 0 on success, 1 when detection
//! fails at runtime, 2 when the configuration is invalid.

use super::commands::{CliArgs, DetectAllArgs, DetectArgs, IndicatorsArgs, OutputFormatArg};
use super::output::OutputFormatter;
use crate::config::{ConfigError, StackscoutConfig};
use crate::detection::detector::{DetectionError, FrameworkDetector};
use crate::detection::indicators::IndicatorSnapshot;
use crate::provider::DockerProvider;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, error};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Environment configuration with command-line overrides applied.
pub fn resolve_config(
    args: &CliArgs,
    threshold: Option<f64>,
) -> Result<StackscoutConfig, ConfigError> {
    let mut config = StackscoutConfig::from_env()?;

    if let Some(path) = &args.indicators {
        config.indicators_path = Some(path.clone());
    }
    if let Some(seconds) = args.timeout {
        config.probe_timeout_secs = seconds;
        config.collector_timeout_secs = config.collector_timeout_secs.max(seconds);
    }
    if let Some(threshold) = threshold {
        config.confidence_threshold = threshold;
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.to_lowercase();
    }

    config.validate()?;
    debug!("{}", config);
    Ok(config)
}

fn build_detector(config: &StackscoutConfig) -> Result<FrameworkDetector, i32> {
    let provider = DockerProvider::connect(config.probe_timeout()).map_err(|e| {
        error!("{}", e);
        eprintln!("Error: {}", e);
        EXIT_FAILURE
    })?;

    FrameworkDetector::from_config(Arc::new(provider), config).map_err(|e| {
        eprintln!("Error: {}", e);
        EXIT_CONFIG_ERROR
    })
}

fn load_config(args: &CliArgs, threshold: Option<f64>) -> Result<StackscoutConfig, i32> {
    resolve_config(args, threshold).map_err(|e| {
        eprintln!("Error: {}", e);
        EXIT_CONFIG_ERROR
    })
}

fn emit(rendered: Result<String>) -> i32 {
    match rendered {
        Ok(text) => {
            print!("{}", text);
            if !text.ends_with('\n') {
                println!();
            }
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            EXIT_FAILURE
        }
    }
}

fn formatter(format: OutputFormatArg, config: &StackscoutConfig) -> OutputFormatter {
    OutputFormatter::new(format.into(), config.confidence_threshold)
}

pub async fn handle_detect(args: &DetectArgs, cli: &CliArgs) -> i32 {
    let config = match load_config(cli, args.threshold) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let detector = match build_detector(&config) {
        Ok(detector) => detector,
        Err(code) => return code,
    };

    match detector.detect(&args.container).await {
        Ok(result) => emit(formatter(args.format, &config).format(&result)),
        Err(e) => {
            if let DetectionError::ContainerNotFound(_) = e {
                eprintln!("Error: {}. Check the id or name with `docker ps`.", e);
            } else {
                eprintln!("Error: {}", e);
            }
            EXIT_FAILURE
        }
    }
}

pub async fn handle_detect_all(args: &DetectAllArgs, cli: &CliArgs) -> i32 {
    let config = match load_config(cli, args.threshold) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let detector = match build_detector(&config) {
        Ok(detector) => detector,
        Err(code) => return code,
    };

    match detector.detect_all().await {
        Ok(entries) => emit(formatter(args.format, &config).format_batch(&entries)),
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_FAILURE
        }
    }
}

pub fn handle_indicators(args: &IndicatorsArgs, cli: &CliArgs) -> i32 {
    let config = match load_config(cli, None) {
        Ok(config) => config,
        Err(code) => return code,
    };
    let table = match config.load_indicators() {
        Ok(table) => table,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_CONFIG_ERROR;
        }
    };

    let snapshot = IndicatorSnapshot::new(&table, config.weights);
    emit(formatter(args.format, &config).format_indicators(&snapshot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_env::{clean_env, EnvGuard};
    use clap::Parser;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_overrides_apply() {
        let _guards = clean_env();
        let cli = CliArgs::parse_from([
            "stackscout",
            "--timeout",
            "45",
            "--indicators",
            "custom.yaml",
            "indicators",
        ]);
        let config = resolve_config(&cli, Some(0.25)).unwrap();
        assert_eq!(config.probe_timeout_secs, 45);
        assert!(config.collector_timeout_secs >= 45);
        assert_eq!(config.confidence_threshold, 0.25);
        assert_eq!(
            config.indicators_path.as_deref(),
            Some(std::path::Path::new("custom.yaml"))
        );
    }

    #[test]
    #[serial]
    fn test_invalid_override_is_config_error() {
        let _guards = clean_env();
        let cli = CliArgs::parse_from(["stackscout", "--timeout", "0", "indicators"]);
        assert!(matches!(
            resolve_config(&cli, None),
            Err(ConfigError::ValidationFailed(_))
        ));

        let cli = CliArgs::parse_from(["stackscout", "--log-level", "loud", "indicators"]);
        assert!(resolve_config(&cli, None).is_err());
    }

    #[test]
    #[serial]
    fn test_overrides_win_over_exported_variables() {
        let _guards = clean_env();
        let _timeout = EnvGuard::set("STACKSCOUT_PROBE_TIMEOUT", "7");
        let _threshold = EnvGuard::set("STACKSCOUT_CONFIDENCE_THRESHOLD", "0.9");

        let cli = CliArgs::parse_from(["stackscout", "indicators"]);
        let config = resolve_config(&cli, None).unwrap();
        assert_eq!(config.probe_timeout_secs, 7);
        assert_eq!(config.confidence_threshold, 0.9);

        let cli = CliArgs::parse_from(["stackscout", "--timeout", "12", "indicators"]);
        let config = resolve_config(&cli, Some(0.5)).unwrap();
        assert_eq!(config.probe_timeout_secs, 12);
        assert_eq!(config.confidence_threshold, 0.5);
    }
}
