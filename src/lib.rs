//! rPROM-Processor library
//!
//! This crate provides the rule-processing stage of a Prometheus metrics
//! pipeline: scraped metrics are filtered, decorated, renamed and
//! namespaced according to configured processing rules before being
//! handed to the emitters.

pub mod cli;
pub mod config;
pub mod error;
pub mod labels;
pub mod pipeline;
pub mod scrape;
pub mod target;
pub mod transformer;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging subsystem
///
/// Logs are written to stderr so processed metrics on stdout stay parseable.
///
/// # Arguments
/// * `level` - Log level string (trace, debug, info, warn, error)
///
/// # Errors
/// Returns an error if the logging system fails to initialize
pub fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
