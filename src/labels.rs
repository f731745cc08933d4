//! Label sets attached to metrics and targets
//!
//! A [`LabelSet`] is an unordered mapping of label names to label values.
//! Every transform stage in the processor reads or mutates label sets, so the
//! merge and join primitives live here.

use serde::{Deserialize, Serialize};
use std::collections::hash_map;
use std::collections::{HashMap, HashSet};

/// Set of label names, used for join keys and attribute allow-lists
pub type LabelNames = HashSet<String>;

/// Mapping of label name to label value
///
/// Comparisons are case-sensitive and exact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet(HashMap<String, String>);

impl LabelSet {
    /// Create an empty label set
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Get the value of a label
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set a label, returning the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Remove a label
    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Check whether a label is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of labels
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the set has no labels
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(name, value)` pairs in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over label names
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Labels sorted by name, for deterministic output
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut pairs: Vec<_> = self.iter().collect();
        pairs.sort_unstable_by_key(|(k, _)| *k);
        pairs
    }

    /// Copy every label of `src` into `self`, overwriting on conflict
    pub fn accumulate(&mut self, src: &LabelSet) {
        for (k, v) in &src.0 {
            self.0.insert(k.clone(), v.clone());
        }
    }

    /// Copy the labels of `src` whose names are in `allow`, overwriting on conflict
    pub fn accumulate_only(&mut self, src: &LabelSet, allow: &LabelNames) {
        for (k, v) in &src.0 {
            if allow.contains(k) {
                self.0.insert(k.clone(), v.clone());
            }
        }
    }

    /// Check that `self` and `other` agree on every label named in `keys`
    ///
    /// Both sets must contain each key with an equal value. An empty key set
    /// always matches.
    pub fn agrees_on(&self, other: &LabelSet, keys: &LabelNames) -> bool {
        keys.iter().all(|k| match (self.0.get(k), other.0.get(k)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        })
    }
}

/// Join a source label set against a destination label set
///
/// Returns the source labels when both sets agree on every key in `keys`,
/// or `None` when the join fails.
pub fn join<'a>(src: &'a LabelSet, dst: &LabelSet, keys: &LabelNames) -> Option<&'a LabelSet> {
    src.agrees_on(dst, keys).then_some(src)
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<HashMap<String, String>> for LabelSet {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map)
    }
}

impl IntoIterator for LabelSet {
    type Item = (String, String);
    type IntoIter = hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a LabelSet {
    type Item = (&'a String, &'a String);
    type IntoIter = hash_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Build a [`LabelNames`] set from string-like items
pub fn names<I, S>(iter: I) -> LabelNames
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    iter.into_iter().map(Into::into).collect()
}
