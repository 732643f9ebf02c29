use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Framework and language detection for running containers
#[derive(Parser, Debug)]
#[command(
    name = "stackscout",
    about = "Framework and language detection for running containers",
    version,
    author,
    long_about = "stackscout inspects a running container's ports, environment variable names, \
                  and dependency manifests, and fuses the evidence into a single framework \
                  classification with a deterministic confidence score."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        help = "Indicator table file (.toml, .yaml, .json) replacing the built-in tables"
    )]
    pub indicators: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_name = "SECONDS",
        help = "Timeout for each container probe"
    )]
    pub timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Detect the framework running in a container",
        long_about = "Inspects one container and reports its framework, language, version \
                      hint, and confidence.\n\n\
                      Examples:\n  \
                      stackscout detect my-app\n  \
                      stackscout detect 3f2a1b9c --format json\n  \
                      stackscout detect my-app --threshold 0.4"
    )]
    Detect(DetectArgs),

    #[command(
        name = "detect-all",
        about = "Detect frameworks in every running container",
        long_about = "Inspects every running container and reports one result per container. \
                      A failure on one container does not stop the others.\n\n\
                      Examples:\n  \
                      stackscout detect-all\n  \
                      stackscout detect-all --format yaml"
    )]
    DetectAll(DetectAllArgs),

    #[command(
        about = "Show the detection tables and weights",
        long_about = "Prints the port, environment, and manifest indicator tables, the axis \
                      weights, and the catalog of recognizable frameworks. No container runtime \
                      is needed.\n\n\
                      Examples:\n  \
                      stackscout indicators\n  \
                      stackscout indicators --indicators custom.toml --format json"
    )]
    Indicators(IndicatorsArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct DetectArgs {
    #[arg(value_name = "CONTAINER", help = "Container id, id prefix, or name")]
    pub container: String,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        long,
        value_name = "T",
        value_parser = parse_threshold,
        help = "Confidence threshold between 0 and 1 (default 0.7)"
    )]
    pub threshold: Option<f64>,
}

#[derive(Parser, Debug, Clone)]
pub struct DetectAllArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        long,
        value_name = "T",
        value_parser = parse_threshold,
        help = "Confidence threshold between 0 and 1 (default 0.7)"
    )]
    pub threshold: Option<f64>,
}

#[derive(Parser, Debug, Clone)]
pub struct IndicatorsArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("Invalid threshold: {}. Expected a number between 0 and 1", s))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!(
            "Invalid threshold: {}. Expected a number between 0 and 1",
            s
        ));
    }
    Ok(value)
}
