//! Metric transformation module
//!
//! This module rewrites scraped metrics according to the configured
//! processing rules and renders the result in Prometheus exposition format.

pub mod decorate;
pub mod engine;
pub mod formatter;
pub mod metric;
pub mod rules;

pub use decorate::{auto_decorate_labels, copy_attributes, matching_decorate, DecorationMap};
pub use engine::{
    add_attributes, filter, rename, rename_metrics, renamespace_metrics, should_ignore,
    TransformEngine,
};
pub use formatter::PrometheusFormatter;
pub use metric::{Metric, MetricType, TargetMetrics};
pub use rules::{
    AddAttributesRule, CopyAttributesRule, DecorateRule, IgnoreRule, ProcessingRule,
    RenameMetricRule, RenameRule, RuleError, RuleSet,
};
