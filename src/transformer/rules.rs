//! Processing rule definitions
//!
//! Rules are grouped in [`ProcessingRule`] bundles as they appear in the
//! configuration file. Each bundle may carry any combination of rule kinds.
//! [`RuleSet`] flattens a list of bundles into one list per transform stage
//! so the per-unit processing never walks the nested configuration.
//!
//! # Example Configuration (YAML)
//!
//! ```yaml
//! transformations:
//!   - description: "redis"
//!     ignore_metrics:
//!       - prefixes: ["redis_exporter_scrapes"]
//!     copy_attributes:
//!       - from_metric: "redis_instance_info"
//!         to_metrics: ["redis_instantaneous_"]
//!         match_by: ["addr"]
//!         attributes: ["os", "role"]
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::labels::{LabelNames, LabelSet};

/// Errors that can occur while validating rules
#[derive(Error, Debug, PartialEq)]
pub enum RuleError {
    /// Copy-attributes rule without a source metric
    #[error("copy_attributes rule has an empty from_metric")]
    EmptySourceMetric,

    /// Copy-attributes rule without destinations
    #[error("copy_attributes rule from '{from_metric}' has no to_metrics")]
    NoDestinations { from_metric: String },

    /// Rename-attributes rule mapping a label to an empty name
    #[error("rename_attributes rule renames '{attribute}' to an empty name")]
    EmptyAttributeName { attribute: String },
}

/// Result type for rule operations
pub type RuleResult<T> = Result<T, RuleError>;

/// A bundle of rules of different kinds, as written in the configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingRule {
    /// Free-form description of the bundle
    #[serde(default)]
    pub description: String,

    /// Attributes added to matching metrics
    #[serde(default)]
    pub add_attributes: Vec<AddAttributesRule>,

    /// Attribute aliases created on matching metrics
    #[serde(default)]
    pub rename_attributes: Vec<RenameRule>,

    /// Metric name changes
    #[serde(default)]
    pub rename_metrics: Vec<RenameMetricRule>,

    /// Metrics dropped before any other processing
    #[serde(default)]
    pub ignore_metrics: Vec<IgnoreRule>,

    /// Cross-metric attribute copies
    #[serde(default)]
    pub copy_attributes: Vec<CopyAttributesRule>,
}

impl ProcessingRule {
    /// Validate every rule in the bundle
    pub fn validate(&self) -> RuleResult<()> {
        self.rename_attributes.iter().try_for_each(RenameRule::validate)?;
        self.copy_attributes
            .iter()
            .try_for_each(CopyAttributesRule::validate)
    }
}

/// Adds `attributes` to the metrics whose name starts with `metric_prefix`
///
/// An empty prefix matches every metric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddAttributesRule {
    /// Metric name prefix
    #[serde(default)]
    pub metric_prefix: String,

    /// Attributes to add
    #[serde(default, deserialize_with = "string_attributes")]
    pub attributes: LabelSet,
}

impl AddAttributesRule {
    /// Create a rule adding the given attributes
    pub fn new<I, K, V>(metric_prefix: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            metric_prefix: metric_prefix.into(),
            attributes: attributes.into_iter().collect(),
        }
    }
}

/// Aliases attributes of the metrics whose name starts with `metric_prefix`
///
/// Each `old -> new` entry copies the value of `old` under `new`. The old
/// attribute is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenameRule {
    /// Metric name prefix
    #[serde(default)]
    pub metric_prefix: String,

    /// Current attribute name to new attribute name, applied in order
    #[serde(
        default,
        deserialize_with = "string_attributes",
        serialize_with = "ordered_attributes"
    )]
    pub attributes: Vec<(String, String)>,
}

impl RenameRule {
    /// Create a rule aliasing the given attribute names
    pub fn new<I, K, V>(metric_prefix: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            metric_prefix: metric_prefix.into(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Check that no attribute is renamed to an empty name
    pub fn validate(&self) -> RuleResult<()> {
        match self.attributes.iter().find(|(_, new)| new.is_empty()) {
            Some((old, _)) => Err(RuleError::EmptyAttributeName {
                attribute: old.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Renames the metric called `from_metric` to `to_metric`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameMetricRule {
    /// Exact metric name to rename
    #[serde(default)]
    pub from_metric: String,

    /// New metric name; an empty name disables the rule
    #[serde(default)]
    pub to_metric: String,
}

impl RenameMetricRule {
    /// Create a metric rename rule
    pub fn new(from_metric: impl Into<String>, to_metric: impl Into<String>) -> Self {
        Self {
            from_metric: from_metric.into(),
            to_metric: to_metric.into(),
        }
    }
}

/// Drops metrics matching any of `prefixes`
///
/// Metrics matching any of `except` are never dropped. When no rule has
/// prefixes but some rule has exceptions, every metric not matching an
/// exception is dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreRule {
    /// Metric name prefixes to drop
    #[serde(default)]
    pub prefixes: Vec<String>,

    /// Metric name prefixes that are never dropped
    #[serde(default)]
    pub except: Vec<String>,
}

impl IgnoreRule {
    /// Rule dropping the given prefixes
    pub fn prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            except: Vec::new(),
        }
    }

    /// Add exception prefixes
    pub fn with_except<I, S>(mut self, except: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.except.extend(except.into_iter().map(Into::into));
        self
    }
}

/// Copies attributes from `from_metric` into metrics prefixed by `to_metrics`
///
/// The copy only happens when source and destination have the same values
/// for every label in `match_by`. When `attributes` is non-empty only those
/// attributes are copied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyAttributesRule {
    /// Exact name of the source metric
    #[serde(default)]
    pub from_metric: String,

    /// Destination metric name prefixes
    #[serde(default)]
    pub to_metrics: Vec<String>,

    /// Labels whose values must agree between source and destination
    #[serde(default)]
    pub match_by: Vec<String>,

    /// Attributes to copy; empty copies all of them
    #[serde(default)]
    pub attributes: Vec<String>,
}

impl CopyAttributesRule {
    /// Check that the rule names a source and at least one destination
    pub fn validate(&self) -> RuleResult<()> {
        if self.from_metric.is_empty() {
            return Err(RuleError::EmptySourceMetric);
        }
        if self.to_metrics.is_empty() {
            return Err(RuleError::NoDestinations {
                from_metric: self.from_metric.clone(),
            });
        }
        Ok(())
    }
}

/// Decoration rule derived from a [`CopyAttributesRule`]
///
/// A `source` metric may decorate the metrics prefixed by any of `dest` when
/// both have in common the labels named in `join`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecorateRule {
    /// Source metric name
    pub source: String,
    /// Destination metric name prefixes
    pub dest: Vec<String>,
    /// Label names that must agree between source and destination
    pub join: LabelNames,
    /// Attributes to copy; empty copies all of them
    pub attributes: LabelNames,
}

impl DecorateRule {
    /// Create a rule copying every attribute unconditionally
    pub fn new<I, S>(source: impl Into<String>, dest: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: source.into(),
            dest: dest.into_iter().map(Into::into).collect(),
            join: LabelNames::new(),
            attributes: LabelNames::new(),
        }
    }

    /// Set the join labels
    pub fn join_on<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.join = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the copied attributes
    pub fn only<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }
}

impl From<&CopyAttributesRule> for DecorateRule {
    fn from(rule: &CopyAttributesRule) -> Self {
        Self {
            source: rule.from_metric.clone(),
            dest: rule.to_metrics.clone(),
            join: rule.match_by.iter().cloned().collect(),
            attributes: rule.attributes.iter().cloned().collect(),
        }
    }
}

/// Rules flattened per transform stage
///
/// Built once from the configured bundles, preserving configuration order
/// within each stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RuleSet {
    /// Filter stage rules
    pub ignore: Vec<IgnoreRule>,
    /// AddAttributes stage rules
    pub add_attributes: Vec<AddAttributesRule>,
    /// Decorate stage rules
    pub decorate: Vec<DecorateRule>,
    /// Rename stage rules
    pub rename_attributes: Vec<RenameRule>,
    /// RenameMetrics stage rules
    pub rename_metrics: Vec<RenameMetricRule>,
}

impl RuleSet {
    /// Create an empty rule set
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten processing rule bundles into per-stage lists
    pub fn from_processing_rules(processing_rules: &[ProcessingRule]) -> Self {
        let mut set = Self::new();
        for pr in processing_rules {
            set.ignore.extend(pr.ignore_metrics.iter().cloned());
            set.add_attributes.extend(pr.add_attributes.iter().cloned());
            set.decorate
                .extend(pr.copy_attributes.iter().map(DecorateRule::from));
            set.rename_attributes
                .extend(pr.rename_attributes.iter().cloned());
            set.rename_metrics.extend(pr.rename_metrics.iter().cloned());
        }
        set
    }

    /// Total number of rules across all stages
    pub fn len(&self) -> usize {
        self.ignore.len()
            + self.add_attributes.len()
            + self.decorate.len()
            + self.rename_attributes.len()
            + self.rename_metrics.len()
    }

    /// Check if no stage has rules
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<ProcessingRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = ProcessingRule>>(iter: I) -> Self {
        let rules: Vec<ProcessingRule> = iter.into_iter().collect();
        Self::from_processing_rules(&rules)
    }
}

/// Deserialize an attribute map, rejecting values that are not strings
/// Read a mapping of string attributes, keeping the configured order
fn string_attributes<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromIterator<(String, String)>,
{
    let raw = serde_yaml::Mapping::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| {
            let key = match key {
                serde_yaml::Value::String(key) => key,
                other => {
                    return Err(serde::de::Error::custom(format!(
                        "attribute name must be a string, got {}",
                        value_kind(&other)
                    )))
                }
            };
            match value {
                serde_yaml::Value::String(s) => Ok((key, s)),
                other => Err(serde::de::Error::custom(format!(
                    "attribute '{}' must be a string, got {}",
                    key,
                    value_kind(&other)
                ))),
            }
        })
        .collect()
}

fn ordered_attributes<S>(attributes: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(attributes.iter().map(|(k, v)| (k, v)))
}

fn value_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}
