//! CLI argument parsing for rPROM-Processor
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: config.yaml, env: RPROM_CONFIG)
//! - `--input` / `-i`: Exposition payload to process, repeatable, `-` for stdin (env: RPROM_INPUT)
//! - `--target-url`: URL of the target the payloads were scraped from (env: RPROM_TARGET_URL)
//! - `--metric-namespace`: Namespace prepended to every metric name (env: RPROM_METRIC_NAMESPACE)
//! - `--queue-length`: Output queue capacity (overrides config file, env: RPROM_QUEUE_LENGTH)
//! - `--validate`: Validate configuration and exit
//! - `--dry-run`: Show the flattened rules and exit
//! - `--log-level` / `-l`: Log level (trace/debug/info/warn/error, env: RPROM_LOG_LEVEL)
//! - `--output-format`: Output format (text/json/yaml)
//!
//! # Precedence
//!
//! Configuration values are resolved in the following order (highest to lowest priority):
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// rPROM-Processor - Prometheus metric rule processor written in Rust
///
/// Reads scraped metrics in Prometheus exposition format, applies the
/// configured processing rules and prints the result.
///
/// Environment variables can be used for all configuration options.
/// CLI arguments take precedence over environment variables,
/// which take precedence over config file values.
#[derive(Parser, Debug)]
#[command(name = "rprom-processor")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "RPROM_CONFIG"
    )]
    pub config: PathBuf,

    /// Exposition payload to process ("-" reads stdin)
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "RPROM_INPUT",
        value_delimiter = ','
    )]
    pub input: Vec<String>,

    /// URL of the scraped target (overrides config file)
    #[arg(long, value_name = "URL", env = "RPROM_TARGET_URL")]
    pub target_url: Option<String>,

    /// Namespace prepended to every metric name of the target
    #[arg(long, value_name = "NAMESPACE", env = "RPROM_METRIC_NAMESPACE")]
    pub metric_namespace: Option<String>,

    /// Output queue capacity (overrides config file)
    #[arg(long, value_name = "N", env = "RPROM_QUEUE_LENGTH")]
    pub queue_length: Option<usize>,

    /// Validate configuration and exit
    #[arg(long)]
    pub validate: bool,

    /// Show the flattened rules and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "RPROM_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Output format for processed metrics, --validate and --dry-run
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Prometheus exposition text / human-readable summaries
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}
