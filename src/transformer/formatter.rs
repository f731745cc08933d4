//! Prometheus Exposition Format output
//!
//! This module renders processed scrape units in the text exposition
//! format (version 0.0.4), and as serializable views for JSON/YAML output.
//!
//! # Format
//!
//! ```text
//! # TYPE <metric_name> <type>
//! <metric_name>{<label1>="<value1>",<label2>="<value2>"} <value>
//! ```

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::metric::{Metric, TargetMetrics};
use crate::target::redacted_url;

/// Prometheus exposition format formatter
///
/// # Example
///
/// ```ignore
/// use rprom_processor::transformer::{Metric, MetricType, PrometheusFormatter};
///
/// let metrics = vec![Metric::new("redis_up", 1.0).with_type(MetricType::Gauge)];
/// let output = PrometheusFormatter::new().format(&metrics);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PrometheusFormatter {
    /// Emit a `# target` comment before each unit
    include_target: bool,
}

impl PrometheusFormatter {
    /// Create a new formatter
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether units are introduced by a `# target` comment
    pub fn with_target_header(mut self, include: bool) -> Self {
        self.include_target = include;
        self
    }

    /// Format a processed unit
    pub fn format_unit(&self, unit: &TargetMetrics) -> String {
        let body = self.format(&unit.metrics);
        if !self.include_target {
            return body;
        }
        format!(
            "# target {} {}\n{}",
            unit.target.name,
            redacted_url(&unit.target.url),
            body
        )
    }

    /// Format metrics into Prometheus exposition format
    ///
    /// - TYPE lines are emitted once per unique metric name
    /// - Labels are sorted alphabetically for deterministic output
    /// - Metrics with the same name are grouped together
    pub fn format(&self, metrics: &[Metric]) -> String {
        if metrics.is_empty() {
            return String::new();
        }

        let mut output = String::with_capacity(metrics.len() * 100);
        let mut seen_metrics: HashSet<&str> = HashSet::new();

        for (name, group) in Self::group_by_name(metrics) {
            if seen_metrics.insert(name) {
                output.push_str(&format!(
                    "# TYPE {} {}\n",
                    name,
                    group[0].metric_type.as_str()
                ));
            }

            for metric in group {
                output.push_str(&Self::format_metric_line(metric));
                output.push('\n');
            }
        }

        output
    }

    /// Group metrics by name, preserving order of first occurrence
    fn group_by_name(metrics: &[Metric]) -> Vec<(&str, Vec<&Metric>)> {
        let mut groups: HashMap<&str, Vec<&Metric>> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for metric in metrics {
            let name = metric.name.as_str();
            if !groups.contains_key(name) {
                order.push(name);
            }
            groups.entry(name).or_default().push(metric);
        }

        order
            .into_iter()
            .filter_map(|name| groups.remove(name).map(|g| (name, g)))
            .collect()
    }

    fn format_metric_line(metric: &Metric) -> String {
        let mut line = metric.name.clone();

        if !metric.attributes.is_empty() {
            let label_pairs: Vec<String> = metric
                .attributes
                .sorted()
                .into_iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, Self::escape_label_value(v)))
                .collect();

            line.push('{');
            line.push_str(&label_pairs.join(","));
            line.push('}');
        }

        line.push(' ');
        line.push_str(&Self::format_value(metric.value));
        line
    }

    /// Format a numeric value for Prometheus
    ///
    /// - NaN → "NaN"
    /// - +Inf → "+Inf"
    /// - -Inf → "-Inf"
    /// - Integers are formatted without decimal point
    /// - Large/small floats use scientific notation
    fn format_value(value: f64) -> String {
        if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            if value.is_sign_positive() {
                "+Inf".to_string()
            } else {
                "-Inf".to_string()
            }
        } else if value.fract() == 0.0 && value.abs() < 1e15 {
            format!("{}", value as i64)
        } else if value.abs() >= 1e6 || (value.abs() < 1e-3 && value != 0.0) {
            format!("{:e}", value)
        } else {
            format!("{}", value)
        }
    }

    /// Escape label value
    ///
    /// Escapes backslash, double-quote, and newline characters.
    fn escape_label_value(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}

/// Serializable view of a processed unit
#[derive(Debug, Serialize)]
pub struct UnitView<'a> {
    /// Target name
    pub target: &'a str,
    /// Target URL with credentials redacted
    pub url: String,
    /// Processed series
    pub metrics: &'a [Metric],
}

impl<'a> From<&'a TargetMetrics> for UnitView<'a> {
    fn from(unit: &'a TargetMetrics) -> Self {
        Self {
            target: &unit.target.name,
            url: redacted_url(&unit.target.url),
            metrics: &unit.metrics,
        }
    }
}
