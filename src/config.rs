//! Configuration management for stackscout
//!
//! Settings are loaded from environment variables with sensible defaults.
//! Command-line flags override individual fields after loading.
//!
//! # Environment Variables
//!
//! - `STACKSCOUT_PROBE_TIMEOUT`: Per provider call timeout in seconds - default: "5"
//! - `STACKSCOUT_COLLECTOR_TIMEOUT`: Per collector timeout in seconds - default: "30"
//! - `STACKSCOUT_CONFIDENCE_THRESHOLD`: Threshold for a confident result - default: "0.7"
//! - `STACKSCOUT_WEIGHT_FILESYSTEM`: Filesystem axis weight - default: "0.5"
//! - `STACKSCOUT_WEIGHT_ENVIRONMENT`: Environment axis weight - default: "0.3"
//! - `STACKSCOUT_WEIGHT_PORT`: Port axis weight - default: "0.2"
//! - `STACKSCOUT_INDICATORS`: Indicator table file (.toml, .yaml, .json) - default: built-in tables
//! - `STACKSCOUT_MAX_CONCURRENCY`: Containers inspected at once by `detect-all` - default: "4"
//! - `STACKSCOUT_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use stackscout::StackscoutConfig;
//!
//! let config = StackscoutConfig::default();
//! config.validate().expect("Invalid configuration");
//! let indicators = config.load_indicators().expect("Invalid indicator table");
//! ```

use crate::detection::combiner::{Weights, WeightsError};
use crate::detection::indicators::{IndicatorError, IndicatorTable};
use crate::detection::types::DEFAULT_CONFIDENCE_THRESHOLD;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_COLLECTOR_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_CONCURRENCY: usize = 4;
const MAX_PROBE_TIMEOUT_SECS: u64 = 300;

const ENV_PROBE_TIMEOUT: &str = "STACKSCOUT_PROBE_TIMEOUT";
const ENV_COLLECTOR_TIMEOUT: &str = "STACKSCOUT_COLLECTOR_TIMEOUT";
const ENV_CONFIDENCE_THRESHOLD: &str = "STACKSCOUT_CONFIDENCE_THRESHOLD";
const ENV_WEIGHT_FILESYSTEM: &str = "STACKSCOUT_WEIGHT_FILESYSTEM";
const ENV_WEIGHT_ENVIRONMENT: &str = "STACKSCOUT_WEIGHT_ENVIRONMENT";
const ENV_WEIGHT_PORT: &str = "STACKSCOUT_WEIGHT_PORT";
const ENV_INDICATORS: &str = "STACKSCOUT_INDICATORS";
const ENV_MAX_CONCURRENCY: &str = "STACKSCOUT_MAX_CONCURRENCY";
const ENV_LOG_LEVEL: &str = "STACKSCOUT_LOG_LEVEL";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },

    #[error("Invalid axis weights: {0}")]
    Weights(#[from] WeightsError),

    #[error(transparent)]
    Indicators(#[from] IndicatorError),
}

/// Main configuration structure for stackscout
#[derive(Debug, Clone, PartialEq)]
pub struct StackscoutConfig {
    /// Timeout for each provider call, in seconds
    pub probe_timeout_secs: u64,

    /// Timeout for each collector as a whole, in seconds
    pub collector_timeout_secs: u64,

    pub confidence_threshold: f64,

    pub weights: Weights,

    /// Indicator table file replacing the built-in tables
    pub indicators_path: Option<PathBuf>,

    /// Containers inspected concurrently by batch detection
    pub max_concurrency: usize,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Fails if `key` is set to something that does not parse as `T`.
fn check_env<T>(key: &str) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(|_| ())
            .map_err(|e| ConfigError::ParseError {
                field: key.to_string(),
                error: format!("'{}': {}", raw, e),
            }),
        Err(_) => Ok(()),
    }
}

impl Default for StackscoutConfig {
    /// Loads from `STACKSCOUT_*` environment variables, falling back to the
    /// defaults for anything missing or unparsable.
    fn default() -> Self {
        let defaults = Weights::default();
        let weights = Weights {
            filesystem: env_or(ENV_WEIGHT_FILESYSTEM, defaults.filesystem),
            environment: env_or(ENV_WEIGHT_ENVIRONMENT, defaults.environment),
            port: env_or(ENV_WEIGHT_PORT, defaults.port),
        };

        let indicators_path = env::var(ENV_INDICATORS)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        let log_level = env::var(ENV_LOG_LEVEL)
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            probe_timeout_secs: env_or(ENV_PROBE_TIMEOUT, DEFAULT_PROBE_TIMEOUT_SECS),
            collector_timeout_secs: env_or(ENV_COLLECTOR_TIMEOUT, DEFAULT_COLLECTOR_TIMEOUT_SECS),
            confidence_threshold: env_or(ENV_CONFIDENCE_THRESHOLD, DEFAULT_CONFIDENCE_THRESHOLD),
            weights,
            indicators_path,
            max_concurrency: env_or(ENV_MAX_CONCURRENCY, DEFAULT_MAX_CONCURRENCY),
            log_level,
        }
    }
}

impl StackscoutConfig {
    /// Like [`Default::default`], but an unparsable variable is an error
    /// instead of silently falling back.
    pub fn from_env() -> Result<Self, ConfigError> {
        check_env::<u64>(ENV_PROBE_TIMEOUT)?;
        check_env::<u64>(ENV_COLLECTOR_TIMEOUT)?;
        check_env::<f64>(ENV_CONFIDENCE_THRESHOLD)?;
        check_env::<f64>(ENV_WEIGHT_FILESYSTEM)?;
        check_env::<f64>(ENV_WEIGHT_ENVIRONMENT)?;
        check_env::<f64>(ENV_WEIGHT_PORT)?;
        check_env::<usize>(ENV_MAX_CONCURRENCY)?;
        Ok(Self::default())
    }

    /// Validates the configuration
    ///
    /// Checks that timeouts are in range, the threshold lies in `[0, 1]`, the
    /// weights are valid, and the log level is known. The indicator file is
    /// only checked by [`StackscoutConfig::load_indicators`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Probe timeout must be at least 1 second".to_string(),
            ));
        }
        if self.probe_timeout_secs > MAX_PROBE_TIMEOUT_SECS {
            return Err(ConfigError::ValidationFailed(format!(
                "Probe timeout cannot exceed {} seconds",
                MAX_PROBE_TIMEOUT_SECS
            )));
        }
        if self.collector_timeout_secs < self.probe_timeout_secs {
            return Err(ConfigError::ValidationFailed(format!(
                "Collector timeout ({}s) must not be shorter than the probe timeout ({}s)",
                self.collector_timeout_secs, self.probe_timeout_secs
            )));
        }

        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(ConfigError::ValidationFailed(format!(
                "Confidence threshold must be between 0 and 1, got {}",
                self.confidence_threshold
            )));
        }

        self.weights.validate()?;

        if self.max_concurrency == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max concurrency must be at least 1".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn collector_timeout(&self) -> Duration {
        Duration::from_secs(self.collector_timeout_secs)
    }

    /// The configured indicator file, or the built-in tables.
    pub fn load_indicators(&self) -> Result<IndicatorTable, ConfigError> {
        match &self.indicators_path {
            Some(path) => Ok(IndicatorTable::load(path)?),
            None => Ok(IndicatorTable::builtin()),
        }
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();

        map.insert(
            "probe_timeout_secs".to_string(),
            self.probe_timeout_secs.to_string(),
        );
        map.insert(
            "collector_timeout_secs".to_string(),
            self.collector_timeout_secs.to_string(),
        );
        map.insert(
            "confidence_threshold".to_string(),
            self.confidence_threshold.to_string(),
        );
        map.insert(
            "weight_filesystem".to_string(),
            self.weights.filesystem.to_string(),
        );
        map.insert(
            "weight_environment".to_string(),
            self.weights.environment.to_string(),
        );
        map.insert("weight_port".to_string(), self.weights.port.to_string());
        if let Some(ref path) = self.indicators_path {
            map.insert("indicators".to_string(), path.display().to_string());
        }
        map.insert(
            "max_concurrency".to_string(),
            self.max_concurrency.to_string(),
        );
        map.insert("log_level".to_string(), self.log_level.clone());

        map
    }
}

impl fmt::Display for StackscoutConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Stackscout Configuration:")?;
        writeln!(f, "  Probe Timeout: {}s", self.probe_timeout_secs)?;
        writeln!(f, "  Collector Timeout: {}s", self.collector_timeout_secs)?;
        writeln!(f, "  Confidence Threshold: {}", self.confidence_threshold)?;
        writeln!(
            f,
            "  Weights: filesystem={} environment={} port={}",
            self.weights.filesystem, self.weights.environment, self.weights.port
        )?;
        match self.indicators_path {
            Some(ref path) => writeln!(f, "  Indicators: {}", path.display())?,
            None => writeln!(f, "  Indicators: built-in")?,
        }
        writeln!(f, "  Max Concurrency: {}", self.max_concurrency)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

/// Environment isolation for tests that read `STACKSCOUT_*` variables
#[cfg(test)]
pub(crate) mod test_env {
    use super::*;

    const ALL_VARS: [&str; 9] = [
        ENV_PROBE_TIMEOUT,
        ENV_COLLECTOR_TIMEOUT,
        ENV_CONFIDENCE_THRESHOLD,
        ENV_WEIGHT_FILESYSTEM,
        ENV_WEIGHT_ENVIRONMENT,
        ENV_WEIGHT_PORT,
        ENV_INDICATORS,
        ENV_MAX_CONCURRENCY,
        ENV_LOG_LEVEL,
    ];

    /// Helper to temporarily set environment variables for testing
    pub(crate) struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        pub(crate) fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        pub(crate) fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    /// Unsets every `STACKSCOUT_*` variable until the guards drop.
    pub(crate) fn clean_env() -> Vec<EnvGuard> {
        ALL_VARS.iter().map(|key| EnvGuard::unset(key)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_env::{clean_env, EnvGuard};
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _guards = clean_env();

        let config = StackscoutConfig::default();

        assert_eq!(config.probe_timeout_secs, DEFAULT_PROBE_TIMEOUT_SECS);
        assert_eq!(config.collector_timeout_secs, DEFAULT_COLLECTOR_TIMEOUT_SECS);
        assert_eq!(config.confidence_threshold, DEFAULT_CONFIDENCE_THRESHOLD);
        assert_eq!(config.weights, Weights::default());
        assert_eq!(config.indicators_path, None);
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_environment_variable_parsing() {
        let _clean = clean_env();
        let _guards = vec![
            EnvGuard::set(ENV_PROBE_TIMEOUT, "10"),
            EnvGuard::set(ENV_COLLECTOR_TIMEOUT, "60"),
            EnvGuard::set(ENV_CONFIDENCE_THRESHOLD, "0.4"),
            EnvGuard::set(ENV_WEIGHT_FILESYSTEM, "0.6"),
            EnvGuard::set(ENV_WEIGHT_ENVIRONMENT, "0.2"),
            EnvGuard::set(ENV_WEIGHT_PORT, "0.2"),
            EnvGuard::set(ENV_INDICATORS, "/etc/stackscout/indicators.toml"),
            EnvGuard::set(ENV_MAX_CONCURRENCY, "8"),
            EnvGuard::set(ENV_LOG_LEVEL, "DEBUG"),
        ];

        let config = StackscoutConfig::from_env().unwrap();

        assert_eq!(config.probe_timeout(), Duration::from_secs(10));
        assert_eq!(config.collector_timeout(), Duration::from_secs(60));
        assert_eq!(config.confidence_threshold, 0.4);
        assert_eq!(config.weights.filesystem, 0.6);
        assert_eq!(
            config.indicators_path,
            Some(PathBuf::from("/etc/stackscout/indicators.toml"))
        );
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.log_level, "debug");
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_unparsable_value() {
        let _clean = clean_env();
        let _guard = EnvGuard::set(ENV_PROBE_TIMEOUT, "soon");

        assert_eq!(
            StackscoutConfig::default().probe_timeout_secs,
            DEFAULT_PROBE_TIMEOUT_SECS
        );
        assert!(matches!(
            StackscoutConfig::from_env(),
            Err(ConfigError::ParseError { field, .. }) if field == ENV_PROBE_TIMEOUT
        ));
    }

    #[test]
    #[serial]
    fn test_validation_invalid_timeouts() {
        let _clean = clean_env();

        let mut config = StackscoutConfig::default();
        config.probe_timeout_secs = 0;
        assert!(config.validate().is_err());

        config.probe_timeout_secs = 301;
        assert!(config.validate().is_err());

        config.probe_timeout_secs = 10;
        config.collector_timeout_secs = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_validation_invalid_threshold_and_concurrency() {
        let _clean = clean_env();

        let mut config = StackscoutConfig::default();
        config.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = StackscoutConfig::default();
        config.confidence_threshold = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = StackscoutConfig::default();
        config.max_concurrency = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_validation_invalid_weights() {
        let _clean = clean_env();
        let _guard = EnvGuard::set(ENV_WEIGHT_PORT, "0.5");

        let config = StackscoutConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Weights(WeightsError::BadSum(_)))
        ));
    }

    #[test]
    #[serial]
    fn test_validation_invalid_log_level() {
        let _clean = clean_env();

        let mut config = StackscoutConfig::default();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    #[serial]
    fn test_load_indicators() {
        let _clean = clean_env();

        let config = StackscoutConfig::default();
        assert_eq!(config.load_indicators().unwrap(), IndicatorTable::builtin());

        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"ports": [{"port": 9090, "framework": "gin"}]}"#)
            .unwrap();

        let config = StackscoutConfig {
            indicators_path: Some(file.path().to_path_buf()),
            ..StackscoutConfig::default()
        };
        let table = config.load_indicators().unwrap();
        assert_eq!(table.ports.len(), 1);
        assert!(table.files.is_empty());

        let config = StackscoutConfig {
            indicators_path: Some(PathBuf::from("/nonexistent/table.toml")),
            ..StackscoutConfig::default()
        };
        assert!(matches!(
            config.load_indicators(),
            Err(ConfigError::Indicators(IndicatorError::Io { .. }))
        ));
    }

    #[test]
    #[serial]
    fn test_config_display() {
        let _clean = clean_env();

        let config = StackscoutConfig::default();
        let display = format!("{}", config);
        assert!(display.contains("Stackscout Configuration:"));
        assert!(display.contains("Indicators: built-in"));
        assert_eq!(
            config.to_display_map().get("weight_filesystem"),
            Some(&"0.5".to_string())
        );
    }
}
