//! Transform Engine - rule-driven rewriting of scrape units
//!
//! This module provides the transform stages applied to every
//! [`TargetMetrics`] and the [`TransformEngine`] running them in order:
//!
//! 1. [`filter`] drops ignored series
//! 2. [`add_attributes`] adds static attributes
//! 3. [`decorate`] copies attributes across series and merges target metadata
//! 4. [`rename`] aliases attributes
//! 5. [`rename_metrics`] renames series
//! 6. [`renamespace_metrics`] prefixes series with the target namespace
//!
//! Stages never fail: rules that do not match are no-ops.

use super::decorate::decorate;
use super::metric::TargetMetrics;
use super::rules::{
    AddAttributesRule, IgnoreRule, ProcessingRule, RenameMetricRule, RenameRule, RuleSet,
};

/// Transform Engine configuration and state
///
/// The engine holds the rules flattened per stage and applies all stages to
/// one unit at a time.
#[derive(Debug, Clone, Default)]
pub struct TransformEngine {
    /// Flattened rule set
    rules: RuleSet,
}

impl TransformEngine {
    /// Create a new TransformEngine with the given rules
    ///
    /// # Example
    ///
    /// ```ignore
    /// use rprom_processor::transformer::{TransformEngine, RuleSet};
    ///
    /// let engine = TransformEngine::new(RuleSet::new());
    /// ```
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    /// Create an engine from configured rule bundles
    pub fn from_processing_rules(processing_rules: &[ProcessingRule]) -> Self {
        Self::new(RuleSet::from_processing_rules(processing_rules))
    }

    /// Create an engine without rules
    ///
    /// It still merges target metadata and applies target namespaces.
    pub fn empty() -> Self {
        Self::new(RuleSet::new())
    }

    /// Get a reference to the rule set
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Apply every stage, in order, to a unit
    pub fn process(&self, target_metrics: &mut TargetMetrics) {
        let scraped = target_metrics.metrics.len();

        filter(target_metrics, &self.rules.ignore);
        add_attributes(target_metrics, &self.rules.add_attributes);
        decorate(target_metrics, &self.rules.decorate);
        rename(target_metrics, &self.rules.rename_attributes);
        rename_metrics(target_metrics, &self.rules.rename_metrics);
        renamespace_metrics(target_metrics);

        tracing::debug!(
            target_name = %target_metrics.target.name,
            scraped,
            kept = target_metrics.metrics.len(),
            "Processed target metrics"
        );
    }
}

/// Decide whether a metric name is dropped by the ignore rules
///
/// An `except` prefix of any rule always keeps the metric. Otherwise a
/// matching ignore prefix of any rule drops it. A metric matching neither is
/// kept, unless the rules only declare exceptions, in which case they act as
/// a whitelist and the metric is dropped.
pub fn should_ignore(name: &str, rules: &[IgnoreRule]) -> bool {
    let matches = |prefixes: &[String]| prefixes.iter().any(|p| name.starts_with(p.as_str()));

    if rules.iter().any(|r| matches(r.except.as_slice())) {
        return false;
    }
    if rules.iter().any(|r| matches(r.prefixes.as_slice())) {
        return true;
    }

    let has_prefixes = rules.iter().any(|r| !r.prefixes.is_empty());
    let has_exceptions = rules.iter().any(|r| !r.except.is_empty());
    !has_prefixes && has_exceptions
}

/// Remove the metrics dropped by the ignore rules
pub fn filter(target_metrics: &mut TargetMetrics, rules: &[IgnoreRule]) {
    if rules.is_empty() {
        return;
    }

    target_metrics.metrics.retain(|m| {
        let ignored = should_ignore(&m.name, rules);
        if ignored {
            tracing::trace!(metric = %m.name, "Ignoring metric");
        }
        !ignored
    });
}

/// Add the rule attributes to every metric matching the rule prefix
pub fn add_attributes(target_metrics: &mut TargetMetrics, rules: &[AddAttributesRule]) {
    if rules.is_empty() {
        return;
    }

    for metric in &mut target_metrics.metrics {
        for rule in rules {
            if metric.name.starts_with(rule.metric_prefix.as_str()) {
                metric.attributes.accumulate(&rule.attributes);
            }
        }
    }
}

/// Copy attribute values under new names on matching metrics
///
/// The old attribute is kept; missing attributes are skipped.
pub fn rename(target_metrics: &mut TargetMetrics, rules: &[RenameRule]) {
    if rules.is_empty() {
        return;
    }

    for metric in &mut target_metrics.metrics {
        for rule in rules {
            if !metric.name.starts_with(rule.metric_prefix.as_str()) {
                continue;
            }
            for (current, updated) in &rule.attributes {
                if let Some(value) = metric.attributes.get(current).map(str::to_owned) {
                    metric.attributes.insert(updated.as_str(), value);
                }
            }
        }
    }
}

/// Rename metrics whose name equals a rule's `from_metric`
///
/// Rules are evaluated in order in a single pass, so a rule may match the
/// name produced by an earlier one.
pub fn rename_metrics(target_metrics: &mut TargetMetrics, rules: &[RenameMetricRule]) {
    for metric in &mut target_metrics.metrics {
        for rule in rules {
            if rule.to_metric.is_empty() {
                continue;
            }
            if metric.name == rule.from_metric {
                metric.name.clone_from(&rule.to_metric);
            }
        }
    }
}

/// Prefix every metric name with the target metric namespace
///
/// Every call prepends `<namespace>.`; it is not idempotent.
pub fn renamespace_metrics(target_metrics: &mut TargetMetrics) {
    let namespace = &target_metrics.target.metric_namespace;
    if namespace.is_empty() {
        return;
    }

    for metric in &mut target_metrics.metrics {
        metric.name = format!("{}.{}", namespace, metric.name);
    }
}
