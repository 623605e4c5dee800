//! Probe definitions
//!
//! A probe is one configured health check. Every probe type implements the
//! [`Probe`] trait; the registry and the scheduler only ever see `dyn Probe`,
//! so adding a new check type never touches them.
//!
//! ## Probe types
//!
//! - **DNS**: resolves a domain and optionally checks the returned addresses
//! - **TCP**: opens (and immediately closes) a connection to `target:port`
//! - **HTTP**: sends one request and checks the response status

pub mod dns;
pub mod duration;
pub mod http;
pub mod tcp;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, ProbeResult};

pub use dns::{DnsProbe, DnsProbeConfig, Resolver, SystemResolver};
pub use http::{HttpMethod, HttpProbe, HttpProbeConfig};
pub use tcp::{TcpProbe, TcpProbeConfig};

/// Smallest interval accepted for a periodic probe
pub const MIN_INTERVAL: Duration = Duration::from_secs(2);

/// Names taken by the creation routes of the control API
pub const RESERVED_NAMES: [&str; 3] = ["dns", "tcp", "http"];

/// Where a probe definition came from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeSource {
    /// Created through the control API
    #[default]
    Api,
    /// Loaded from the daemon configuration file
    Configuration,
}

impl fmt::Display for ProbeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeSource::Api => write!(f, "api"),
            ProbeSource::Configuration => write!(f, "configuration"),
        }
    }
}

/// Configuration fields shared by every probe type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Time between two executions. Only meaningful for periodic probes.
    #[serde(default, with = "duration")]
    pub interval: Duration,

    #[serde(default, alias = "one-off")]
    pub one_off: bool,

    /// Set on admission, never taken from the caller
    #[serde(default, skip_deserializing)]
    pub source: ProbeSource,
}

impl BaseConfig {
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            description: None,
            interval,
            one_off: false,
            source: ProbeSource::default(),
        }
    }

    pub fn one_off(name: impl Into<String>) -> Self {
        Self {
            one_off: true,
            ..Self::new(name, Duration::ZERO)
        }
    }

    /// Checks the fields common to all probe types
    pub fn validate(&self) -> ProbeResult<()> {
        if self.name.trim().is_empty() {
            return Err(ProbeError::validation("the probe name is missing"));
        }
        if RESERVED_NAMES.contains(&self.name.as_str()) {
            return Err(ProbeError::validation(format!(
                "the probe name {} is reserved",
                self.name
            )));
        }
        if !self.one_off && self.interval < MIN_INTERVAL {
            return Err(ProbeError::validation(format!(
                "the probe interval should be at least {}s (got {})",
                MIN_INTERVAL.as_secs(),
                duration::format_duration(&self.interval)
            )));
        }
        Ok(())
    }

    /// Builds the human readable summary for a probe targeting `target`
    pub fn summarize(&self, target: &str) -> String {
        match self.description.as_deref() {
            Some(description) if !description.is_empty() => format!("{description} on {target}"),
            _ => format!("on {target}"),
        }
    }
}

/// Snapshot of a registered probe, as returned by listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeSummary {
    pub name: String,
    pub kind: String,
    pub summary: String,
    pub source: ProbeSource,
    #[serde(with = "duration")]
    pub interval: Duration,
    pub config: serde_json::Value,
}

/// Capability set implemented by every probe type
#[async_trait]
pub trait Probe: Send + Sync {
    /// Checks required fields and the interval floor. Never touches the network.
    fn validate(&self) -> ProbeResult<()>;

    /// Prepares per-execution state. Safe to call more than once.
    fn initialize(&mut self) -> ProbeResult<()>;

    /// Performs exactly one check attempt, without retrying
    async fn execute(&self) -> ProbeResult<()>;

    fn base(&self) -> &BaseConfig;

    /// Short type tag (`dns`, `tcp`, `http`, ...)
    fn kind(&self) -> &'static str;

    fn summary(&self) -> String;

    fn set_source(&mut self, source: ProbeSource);

    /// Serializable snapshot of the full configuration
    fn config(&self) -> serde_json::Value;

    /// Span carrying the probe's contextual fields; every log event about
    /// this probe is emitted under it.
    fn span(&self) -> &tracing::Span;

    fn name(&self) -> &str {
        &self.base().name
    }

    fn one_off(&self) -> bool {
        self.base().one_off
    }

    fn interval(&self) -> Duration {
        self.base().interval
    }

    fn describe(&self) -> ProbeSummary {
        let base = self.base();
        ProbeSummary {
            name: base.name.clone(),
            kind: self.kind().to_string(),
            summary: self.summary(),
            source: base.source,
            interval: base.interval,
            config: self.config(),
        }
    }
}

/// Configuration of any of the built-in probe types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProbeConfig {
    Dns(DnsProbeConfig),
    Tcp(TcpProbeConfig),
    Http(HttpProbeConfig),
}

impl ProbeConfig {
    pub fn into_probe(self) -> Box<dyn Probe> {
        match self {
            ProbeConfig::Dns(config) => Box::new(DnsProbe::new(config)),
            ProbeConfig::Tcp(config) => Box::new(TcpProbe::new(config)),
            ProbeConfig::Http(config) => Box::new(HttpProbe::new(config)),
        }
    }
}
