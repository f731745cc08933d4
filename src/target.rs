//! Scrape targets and their metadata
//!
//! A [`Target`] identifies the endpoint a batch of metrics was scraped from.
//! Its metadata labels are merged into every metric during decoration.

use once_cell::sync::OnceCell;
use url::Url;

use crate::config::{TargetConfig, TargetUrl, TlsConfig};
use crate::error::TargetError;
use crate::labels::LabelSet;

/// Metadata label holding the redacted target URL
pub const SCRAPED_TARGET_URL: &str = "scrapedTargetURL";
/// Metadata label holding the discovered object name
pub const SCRAPED_TARGET_NAME: &str = "scrapedTargetName";
/// Metadata label holding the discovered object kind
pub const SCRAPED_TARGET_KIND: &str = "scrapedTargetKind";

/// Placeholder that replaces passwords embedded in target URLs
pub const REDACTED_PASSWORD: &str = "xxxxx";

/// Object kind for targets configured by URL
pub const USER_PROVIDED_KIND: &str = "user_provided";

/// Endpoint the processor exposes its own metrics on
pub const SELF_ENDPOINT: &str = "localhost:8080";

const DEFAULT_METRICS_PATH: &str = "/metrics";

/// A discovered resource exposing a metrics endpoint (e.g. a pod or a service)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Object {
    /// Object name
    pub name: String,
    /// Object kind, such as `user_provided`
    pub kind: String,
    /// Labels attached to the object by discovery
    pub labels: LabelSet,
}

/// A metrics endpoint exposed by an [`Object`]
#[derive(Debug, Clone)]
pub struct Target {
    /// Target name
    pub name: String,
    /// Object owning the endpoint
    pub object: Object,
    /// Endpoint URL, possibly carrying credentials
    pub url: Url,
    /// TLS settings used to scrape the endpoint
    pub tls_config: TlsConfig,
    /// Prefix prepended to every metric name of this target, if non-empty
    pub metric_namespace: String,
    metadata: OnceCell<LabelSet>,
}

impl Target {
    /// Create a target from discovered information
    pub fn new(name: impl Into<String>, url: Url, object: Object) -> Self {
        Self {
            name: name.into(),
            object,
            url,
            tls_config: TlsConfig::default(),
            metric_namespace: String::new(),
            metadata: OnceCell::new(),
        }
    }

    /// Set the metric namespace
    pub fn with_metric_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.metric_namespace = namespace.into();
        self
    }

    /// Set the TLS configuration
    pub fn with_tls_config(mut self, tls_config: TlsConfig) -> Self {
        self.tls_config = tls_config;
        self
    }

    /// Build a target from a configured URL
    ///
    /// A URL without scheme is assumed to be `http`, and a URL without path
    /// is assumed to point at `/metrics`: `hostname:8080` becomes
    /// `http://hostname:8080/metrics`.
    pub fn from_url(target_url: &TargetUrl, tls_config: &TlsConfig) -> Result<Self, TargetError> {
        let raw = if target_url.url.contains("://") {
            target_url.url.clone()
        } else {
            format!("http://{}", target_url.url)
        };

        let mut url = Url::parse(&raw).map_err(|source| TargetError::InvalidUrl {
            url: target_url.url.clone(),
            source,
        })?;
        if !has_explicit_path(&raw) {
            url.set_path(DEFAULT_METRICS_PATH);
        }

        let host = host_with_port(&url);
        let object = Object {
            name: host.clone(),
            kind: USER_PROVIDED_KIND.to_string(),
            labels: LabelSet::new(),
        };

        Ok(Self::new(host, url, object)
            .with_tls_config(tls_config.clone())
            .with_metric_namespace(target_url.metric_namespace.clone()))
    }

    /// Target for the processor's own metrics endpoint
    pub fn self_target() -> Result<Self, TargetError> {
        Self::from_url(&TargetUrl::new(SELF_ENDPOINT), &TlsConfig::default())
    }

    /// Metadata labels of this target
    ///
    /// Built on first access from the redacted URL, the object name and kind
    /// (when the object is named) and the object labels, later entries
    /// overwriting earlier ones. The result is cached for the lifetime of
    /// the target.
    pub fn metadata(&self) -> &LabelSet {
        self.metadata.get_or_init(|| {
            let mut metadata = LabelSet::new();
            metadata.insert(SCRAPED_TARGET_URL, redacted_url(&self.url));
            if !self.object.name.is_empty() {
                metadata.insert(SCRAPED_TARGET_NAME, self.object.name.clone());
                metadata.insert(SCRAPED_TARGET_KIND, self.object.kind.clone());
            }
            metadata.accumulate(&self.object.labels);
            metadata
        })
    }
}

/// Convert every URL of a target configuration into a [`Target`]
pub fn targets_from_config(config: &TargetConfig) -> Result<Vec<Target>, TargetError> {
    config
        .urls
        .iter()
        .map(|u| Target::from_url(u, &config.tls_config))
        .collect()
}

/// String form of a URL with any embedded password replaced
pub fn redacted_url(url: &Url) -> String {
    if url.password().is_none() {
        return url.to_string();
    }
    let mut redacted = url.clone();
    // set_password only fails for URLs that cannot carry credentials,
    // which is ruled out by the password being present.
    if redacted.set_password(Some(REDACTED_PASSWORD)).is_err() {
        return url.to_string();
    }
    redacted.to_string()
}

fn host_with_port(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

/// Whether the authority of `raw` is followed by a path segment
fn has_explicit_path(raw: &str) -> bool {
    let rest = match raw.find("://") {
        Some(idx) => &raw[idx + 3..],
        None => raw,
    };
    matches!(
        rest.find(['/', '?', '#']).map(|i| rest.as_bytes()[i]),
        Some(b'/')
    )
}
