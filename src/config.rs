//! Configuration management for rPROM-Processor
//!
//! Handles loading and validating configuration from YAML files.
//!
//! ```yaml
//! queue_length: 100
//! transformations:
//!   - description: "redis"
//!     ignore_metrics:
//!       - prefixes: ["redis_exporter_scrapes"]
//! targets:
//!   - description: "local redis exporter"
//!     urls: ["redis-exporter:9121", {url: "https://admin:pw@redis:9121", metric_namespace: "cache"}]
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::transformer::{ProcessingRule, RuleError};

/// Default capacity of the processor output queue
pub const DEFAULT_QUEUE_LENGTH: usize = 100;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A transformation rule is invalid
    #[error("Invalid transformation rule: {0}")]
    Rule(#[from] RuleError),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Capacity of the processor output queue
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Processing rule bundles, applied in order
    #[serde(default)]
    pub transformations: Vec<ProcessingRule>,

    /// Statically configured targets
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

/// A group of statically configured endpoints sharing TLS settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Free-form description
    #[serde(default)]
    pub description: String,

    /// Endpoint URLs
    #[serde(default)]
    pub urls: Vec<TargetUrl>,

    /// TLS settings for every URL of the group
    #[serde(default)]
    pub tls_config: TlsConfig,
}

/// A configured endpoint URL
///
/// Accepts either a bare string or a `{url, metric_namespace}` mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawTargetUrl")]
pub struct TargetUrl {
    /// Endpoint URL, scheme and path optional
    pub url: String,

    /// Prefix prepended to every metric scraped from this URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metric_namespace: String,
}

impl TargetUrl {
    /// URL without metric namespace
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            metric_namespace: String::new(),
        }
    }

    /// Set the metric namespace
    pub fn with_metric_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.metric_namespace = namespace.into();
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTargetUrl {
    Plain(String),
    Full {
        url: String,
        #[serde(default)]
        metric_namespace: String,
    },
}

impl From<RawTargetUrl> for TargetUrl {
    fn from(raw: RawTargetUrl) -> Self {
        match raw {
            RawTargetUrl::Plain(url) => TargetUrl::new(url),
            RawTargetUrl::Full {
                url,
                metric_namespace,
            } => TargetUrl::new(url).with_metric_namespace(metric_namespace),
        }
    }
}

/// TLS settings for scraping a target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// CA bundle used to verify the endpoint
    #[serde(default)]
    pub ca_file_path: String,

    /// Client certificate
    #[serde(default)]
    pub cert_file_path: String,

    /// Client key
    #[serde(default)]
    pub key_file_path: String,

    /// Skip server certificate verification
    #[serde(default)]
    pub insecure_skip_verify: bool,
}

fn default_queue_length() -> usize {
    DEFAULT_QUEUE_LENGTH
}

impl Default for Config {
    fn default() -> Self {
        Self {
            queue_length: default_queue_length(),
            transformations: Vec::new(),
            targets: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated
    ///
    /// # Note
    /// - If the file doesn't exist, returns `ConfigError::ReadError`
    /// - Use `Config::load_or_default()` if you want fallback to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    ///
    /// Use this for optional configuration files (e.g., when running without explicit config)
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_length == 0 {
            return Err(ConfigError::ValidationError(
                "queue_length must be greater than 0".to_string(),
            ));
        }

        for rule in &self.transformations {
            rule.validate()?;
        }

        for target in &self.targets {
            if target.urls.iter().any(|u| u.url.trim().is_empty()) {
                return Err(ConfigError::ValidationError(format!(
                    "target '{}' has an empty url",
                    target.description
                )));
            }
        }

        Ok(())
    }
}
