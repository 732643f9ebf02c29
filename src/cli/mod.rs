pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, DetectAllArgs, DetectArgs, IndicatorsArgs};
pub use output::{OutputFormat, OutputFormatter};
