//! rPROM-Processor - Prometheus metric rule processor
//!
//! Reads scrape payloads in Prometheus exposition format, pushes them
//! through the rule processor and prints the processed metrics.

use std::io::Write;

use anyhow::Result;
use clap::Parser;
use tokio::io::AsyncReadExt;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use rprom_processor::cli::{Cli, OutputFormat};
use rprom_processor::config::{Config, TargetUrl, TlsConfig};
use rprom_processor::error::{AppError, AppResult};
use rprom_processor::pipeline::RuleProcessor;
use rprom_processor::scrape::parse_exposition;
use rprom_processor::target::{targets_from_config, Target};
use rprom_processor::transformer::formatter::UnitView;
use rprom_processor::transformer::{PrometheusFormatter, RuleSet, TargetMetrics};

const STDIN_INPUT: &str = "-";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    rprom_processor::init_logging(&cli.log_level.to_string())?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting rPROM-Processor"
    );

    let mut config = Config::load_or_default(&cli.config)?;
    if let Some(queue_length) = cli.queue_length {
        config.queue_length = queue_length;
        config.validate()?;
    }

    if cli.validate {
        print_validation(&config, cli.output_format)?;
        return Ok(());
    }

    let processor = RuleProcessor::new(&config.transformations, config.queue_length);

    if cli.dry_run {
        print_rules(processor.engine().rules(), cli.output_format)?;
        return Ok(());
    }

    let target = resolve_target(&cli, &config)?;
    info!(
        target_name = %target.name,
        namespace = %target.metric_namespace,
        "Processing scrape payloads"
    );

    let inputs = if cli.input.is_empty() {
        vec![STDIN_INPUT.to_string()]
    } else {
        cli.input.clone()
    };

    let (tx, input) = mpsc::channel(config.queue_length);
    let (mut output, worker) = processor.spawn(input);
    let producer = tokio::spawn(produce(inputs, target, tx));

    let formatter = PrometheusFormatter::new().with_target_header(true);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    let mut interrupted = false;
    loop {
        tokio::select! {
            unit = output.recv() => match unit {
                Some(unit) => print_unit(&unit, &formatter, cli.output_format)?,
                None => break,
            },
            _ = &mut shutdown => {
                producer.abort();
                interrupted = true;
                break;
            }
        }
    }
    drop(output);

    let published = worker
        .await
        .map_err(|e| AppError::Pipeline(e.to_string()))?;

    match producer.await {
        Ok(result) => result?,
        Err(e) if e.is_cancelled() => warn!("Input reading interrupted"),
        Err(e) => return Err(AppError::Pipeline(e.to_string()).into()),
    }

    if interrupted {
        info!(published, "Processing interrupted");
        // a pending stdin read holds a blocking thread until EOF
        std::io::stdout().flush()?;
        std::process::exit(0);
    }

    info!(published, "Processing complete");
    Ok(())
}

/// Target the payloads are attributed to
///
/// `--target-url` wins over the first configured target, which wins over
/// the processor's own endpoint.
fn resolve_target(cli: &Cli, config: &Config) -> AppResult<Target> {
    let mut target = match &cli.target_url {
        Some(url) => Target::from_url(&TargetUrl::new(url.as_str()), &TlsConfig::default())?,
        None => match config.targets.first() {
            Some(target_config) => match targets_from_config(target_config)?.into_iter().next() {
                Some(target) => target,
                None => Target::self_target()?,
            },
            None => Target::self_target()?,
        },
    };

    if let Some(namespace) = &cli.metric_namespace {
        target.metric_namespace = namespace.clone();
    }

    Ok(target)
}

/// Parse every input and send one unit per input to the processor
async fn produce(
    inputs: Vec<String>,
    target: Target,
    tx: mpsc::Sender<TargetMetrics>,
) -> AppResult<()> {
    for source_name in inputs {
        let text = read_input(&source_name).await?;
        let metrics = parse_exposition(&text).map_err(|error| AppError::Parse {
            source_name: source_name.clone(),
            error,
        })?;

        tracing::debug!(source = %source_name, series = metrics.len(), "Read scrape payload");

        if tx
            .send(TargetMetrics::new(target.clone(), metrics))
            .await
            .is_err()
        {
            warn!("Rule processor stopped before all inputs were sent");
            break;
        }
    }

    Ok(())
}

async fn read_input(source_name: &str) -> AppResult<String> {
    let io_error = |error: std::io::Error| AppError::Io {
        source_name: source_name.to_string(),
        error,
    };

    if source_name == STDIN_INPUT {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .map_err(io_error)?;
        Ok(text)
    } else {
        tokio::fs::read_to_string(source_name)
            .await
            .map_err(io_error)
    }
}

fn print_unit(
    unit: &TargetMetrics,
    formatter: &PrometheusFormatter,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", formatter.format_unit(unit)),
        OutputFormat::Json => println!("{}", serde_json::to_string(&UnitView::from(unit))?),
        OutputFormat::Yaml => print!("---\n{}", serde_yaml::to_string(&UnitView::from(unit))?),
    }
    Ok(())
}

fn print_validation(config: &Config, format: OutputFormat) -> Result<()> {
    let summary = serde_json::json!({
        "valid": true,
        "queue_length": config.queue_length,
        "transformations": config.transformations.len(),
        "targets": config.targets.len(),
    });

    match format {
        OutputFormat::Text => {
            println!("Configuration is valid");
            println!("  queue_length: {}", config.queue_length);
            println!("  transformations: {}", config.transformations.len());
            println!("  targets: {}", config.targets.len());
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&summary)?),
    }
    Ok(())
}

fn print_rules(rules: &RuleSet, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("Flattened rules ({} total)", rules.len());
            for rule in &rules.ignore {
                println!(
                    "  ignore prefixes={:?} except={:?}",
                    rule.prefixes, rule.except
                );
            }
            for rule in &rules.add_attributes {
                println!(
                    "  add_attributes prefix={:?} attributes={:?}",
                    rule.metric_prefix,
                    rule.attributes.sorted()
                );
            }
            for rule in &rules.decorate {
                let mut join: Vec<&String> = rule.join.iter().collect();
                join.sort();
                println!(
                    "  copy_attributes from={:?} to={:?} match_by={:?}",
                    rule.source, rule.dest, join
                );
            }
            for rule in &rules.rename_attributes {
                println!(
                    "  rename_attributes prefix={:?} attributes={:?}",
                    rule.metric_prefix,
                    rule.attributes
                );
            }
            for rule in &rules.rename_metrics {
                println!(
                    "  rename_metrics {:?} -> {:?}",
                    rule.from_metric, rule.to_metric
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(rules)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(rules)?),
    }
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
