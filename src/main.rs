use stackscout::cli::commands::{CliArgs, Commands};
use stackscout::cli::handlers::{
    handle_detect, handle_detect_all, handle_indicators, EXIT_CONFIG_ERROR,
};
use stackscout::util::logging::{init_logging, parse_level, LoggingConfig};
use stackscout::VERSION;

use clap::Parser;
use std::env;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    let level = match log_level_from_args(&args) {
        Ok(level) => level,
        Err(message) => {
            eprintln!("Error: {}", message);
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    };
    init_logging(LoggingConfig::with_level(level));

    debug!("stackscout v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Detect(detect_args) => handle_detect(detect_args, &args).await,
        Commands::DetectAll(batch_args) => handle_detect_all(batch_args, &args).await,
        Commands::Indicators(indicator_args) => handle_indicators(indicator_args, &args),
    };

    std::process::exit(exit_code);
}

fn log_level_from_args(args: &CliArgs) -> Result<Level, String> {
    if let Some(level_str) = &args.log_level {
        return parse_level(level_str).ok_or_else(|| {
            format!(
                "Invalid log level '{}'. Valid levels: trace, debug, info, warn, error",
                level_str
            )
        });
    }
    if args.verbose {
        return Ok(Level::DEBUG);
    }
    if args.quiet {
        return Ok(Level::ERROR);
    }

    let level_str = env::var("STACKSCOUT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    Ok(parse_level(&level_str).unwrap_or(Level::INFO))
}
