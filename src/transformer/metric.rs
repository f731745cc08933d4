//! Metric series and per-target scrape units

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::labels::LabelSet;
use crate::target::Target;

/// Prometheus metric type
///
/// Taken from the `# TYPE` line of the scrape payload. The default type is
/// `Untyped` when not specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricType {
    /// Gauge metric - a value that can go up and down
    Gauge,
    /// Counter metric - a monotonically increasing value
    Counter,
    /// Histogram metric - observations counted in buckets
    Histogram,
    /// Summary metric - observations summarized in quantiles
    Summary,
    /// Untyped metric - type is not specified
    #[default]
    Untyped,
}

impl MetricType {
    /// Returns the Prometheus type string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
            MetricType::Histogram => "histogram",
            MetricType::Summary => "summary",
            MetricType::Untyped => "untyped",
        }
    }

    /// Parse a `# TYPE` keyword, case-insensitively
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gauge" => Some(MetricType::Gauge),
            "counter" => Some(MetricType::Counter),
            "histogram" => Some(MetricType::Histogram),
            "summary" => Some(MetricType::Summary),
            "untyped" | "unknown" => Some(MetricType::Untyped),
            _ => None,
        }
    }
}

impl Serialize for MetricType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MetricType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MetricType::parse(&s).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "unknown metric type '{}', expected one of: gauge, counter, histogram, summary, untyped",
                s
            ))
        })
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single metric series with its attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    /// Metric name
    pub name: String,
    /// Sample value
    pub value: f64,
    /// Metric type
    #[serde(rename = "type", default)]
    pub metric_type: MetricType,
    /// Attributes rewritten by the transform stages
    #[serde(default)]
    pub attributes: LabelSet,
}

impl Metric {
    /// Create an untyped metric without attributes
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            metric_type: MetricType::Untyped,
            attributes: LabelSet::new(),
        }
    }

    /// Set the metric type
    pub fn with_type(mut self, metric_type: MetricType) -> Self {
        self.metric_type = metric_type;
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key, value);
        self
    }

    /// Replace the attributes
    pub fn with_attributes(mut self, attributes: LabelSet) -> Self {
        self.attributes = attributes;
        self
    }
}

/// Metrics produced by a single scrape of a [`Target`]
///
/// This is the unit of work flowing through the processor.
#[derive(Debug, Clone)]
pub struct TargetMetrics {
    /// The scraped target
    pub target: Target,
    /// Scraped series, in exposition order
    pub metrics: Vec<Metric>,
}

impl TargetMetrics {
    /// Create a scrape unit
    pub fn new(target: Target, metrics: Vec<Metric>) -> Self {
        Self { target, metrics }
    }

    /// Number of series in the unit
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Check if the unit carries no series
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Iterate over the series called `name`
    pub fn series<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Metric> + 'a {
        self.metrics.iter().filter(move |m| m.name == name)
    }
}
