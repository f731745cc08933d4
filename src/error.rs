//! Error types for rPROM-Processor
//!
//! This module defines the error types used throughout the application.
//! The transform stages themselves are infallible; errors only arise while
//! loading configuration, building targets and reading scrape payloads.

use thiserror::Error;

/// Errors raised while parsing exposition-format scrape payloads
#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    /// Sample line without a value
    #[error("line {line}: missing sample value")]
    MissingValue { line: usize },

    /// Sample value that is not a float
    #[error("line {line}: invalid sample value '{value}'")]
    InvalidValue { line: usize, value: String },

    /// Metric name not matching `[a-zA-Z_:][a-zA-Z0-9_:]*`
    #[error("line {line}: invalid metric name '{name}'")]
    InvalidMetricName { line: usize, name: String },

    /// Malformed `{...}` label block
    #[error("line {line}: malformed labels: {reason}")]
    MalformedLabels { line: usize, reason: String },
}

/// Errors raised while turning configured URLs into targets
#[derive(Error, Debug)]
pub enum TargetError {
    /// URL could not be parsed
    #[error("Invalid target URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// Target construction error
    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    /// Scrape payload could not be parsed
    #[error("Parse error in {source_name}: {error}")]
    Parse {
        source_name: String,
        #[source]
        error: ParseError,
    },

    /// Reading a scrape payload failed
    #[error("Failed to read {source_name}: {error}")]
    Io {
        source_name: String,
        #[source]
        error: std::io::Error,
    },

    /// The processing pipeline stopped unexpectedly
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;
