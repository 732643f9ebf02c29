//! Structured logging setup
//!
//! Logs go to stderr so that `--format json` output on stdout stays machine
//! readable. `RUST_LOG` directives are honored on top of the configured level.
//!
//! ```no_run
//! use stackscout::util::logging::{self, LoggingConfig};
//! use tracing::Level;
//!
//! logging::init_logging(LoggingConfig::with_level(Level::DEBUG));
//! tracing::debug!(container = "web", "Probing container");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Dependencies that are chatty at debug level
const QUIET_TARGETS: [&str; 3] = ["bollard=warn", "hyper=warn", "hyper_util=warn"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Minimum level for stackscout's own events
    pub level: Level,

    /// One JSON object per event instead of human-readable lines
    pub use_json: bool,

    pub include_target: bool,

    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn json(mut self) -> Self {
        self.use_json = true;
        self.include_target = true;
        self
    }
}

/// Parses a log level name, case-insensitively.
pub fn parse_level(level_str: &str) -> Option<Level> {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn build_filter(level: Level) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();

    if let Ok(directive) = format!("stackscout={}", level).parse::<Directive>() {
        filter = filter.add_directive(directive);
    }

    if env::var("RUST_LOG").is_err() {
        for target in QUIET_TARGETS {
            if let Ok(directive) = target.parse::<Directive>() {
                filter = filter.add_directive(directive);
            }
        }
    }

    filter
}

/// Installs the global subscriber. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(config.level);

        if config.use_json {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(config.include_target)
                        .with_file(config.include_location)
                        .with_line_number(config.include_location),
                )
                .init();
        }
    });
}

/// Initializes logging from `STACKSCOUT_LOG_LEVEL` and `STACKSCOUT_LOG_JSON`.
pub fn init_from_env() {
    let level = env::var("STACKSCOUT_LOG_LEVEL")
        .ok()
        .and_then(|v| parse_level(&v))
        .unwrap_or(Level::INFO);

    let use_json = env::var("STACKSCOUT_LOG_JSON")
        .ok()
        .and_then(|v| v.parse::<bool>().ok())
        .unwrap_or(false);

    let config = LoggingConfig::with_level(level);
    init_logging(if use_json { config.json() } else { config });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Some(Level::TRACE));
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("info"), Some(Level::INFO));
        assert_eq!(parse_level("warn"), Some(Level::WARN));
        assert_eq!(parse_level("error"), Some(Level::ERROR));
    }

    #[test]
    fn test_parse_level_case_insensitive() {
        assert_eq!(parse_level("TRACE"), Some(Level::TRACE));
        assert_eq!(parse_level(" Debug "), Some(Level::DEBUG));
    }

    #[test]
    fn test_parse_level_invalid() {
        assert_eq!(parse_level("invalid"), None);
        assert_eq!(parse_level(""), None);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
        assert!(!config.include_location);
    }

    #[test]
    fn test_json_config() {
        let config = LoggingConfig::with_level(Level::WARN).json();
        assert_eq!(config.level, Level::WARN);
        assert!(config.use_json);
        assert!(config.include_target);
    }
}
