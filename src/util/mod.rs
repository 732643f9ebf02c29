//! Utility modules for stackscout

pub mod logging;

pub use logging::{init_from_env, init_logging, parse_level, LoggingConfig};
