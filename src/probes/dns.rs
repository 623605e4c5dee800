//! DNS probe - resolves a domain and checks the returned addresses

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ProbeError, ProbeResult};

use super::{BaseConfig, Probe, ProbeSource};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsProbeConfig {
    #[serde(flatten)]
    pub base: BaseConfig,

    pub domain: String,

    /// Addresses that must all be part of the answer. Empty means any answer is fine.
    #[serde(default, alias = "expected-ips")]
    pub expected_ips: Vec<IpAddr>,
}

/// Name resolution used by the DNS probe
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn lookup_ip(&self, domain: &str) -> std::io::Result<Vec<IpAddr>>;
}

/// Resolver backed by the platform's `getaddrinfo`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

#[async_trait]
impl Resolver for SystemResolver {
    async fn lookup_ip(&self, domain: &str) -> std::io::Result<Vec<IpAddr>> {
        let addrs = tokio::net::lookup_host((domain, 0)).await?;
        Ok(addrs.map(|addr| addr.ip()).collect())
    }
}

pub struct DnsProbe {
    config: DnsProbeConfig,
    resolver: Arc<dyn Resolver>,
    span: tracing::Span,
}

impl DnsProbe {
    pub fn new(config: DnsProbeConfig) -> Self {
        Self::with_resolver(config, Arc::new(SystemResolver))
    }

    pub fn with_resolver(config: DnsProbeConfig, resolver: Arc<dyn Resolver>) -> Self {
        let span = tracing::info_span!(
            "probe",
            name = %config.base.name,
            domain = %config.domain
        );
        Self {
            config,
            resolver,
            span,
        }
    }
}

/// Checks that every expected address is part of the resolved set.
///
/// Addresses are compared semantically, so `::ffff:10.0.0.1` matches `10.0.0.1`.
pub fn verify_ips(expected: &[IpAddr], resolved: &[IpAddr]) -> anyhow::Result<()> {
    let not_found: Vec<String> = expected
        .iter()
        .filter(|expected| {
            !resolved
                .iter()
                .any(|ip| ip.to_canonical() == expected.to_canonical())
        })
        .map(|ip| ip.to_string())
        .collect();

    if !not_found.is_empty() {
        anyhow::bail!("expected IP addresses not found: {}", not_found.join(","));
    }
    Ok(())
}

#[async_trait]
impl Probe for DnsProbe {
    fn validate(&self) -> ProbeResult<()> {
        self.config.base.validate()?;
        if self.config.domain.trim().is_empty() {
            return Err(ProbeError::validation("the probe domain is missing"));
        }
        Ok(())
    }

    fn initialize(&mut self) -> ProbeResult<()> {
        Ok(())
    }

    async fn execute(&self) -> ProbeResult<()> {
        let domain = &self.config.domain;
        let resolved = self
            .resolver
            .lookup_ip(domain)
            .await
            .with_context(|| format!("failed to lookup IP for domain {domain}"))
            .map_err(ProbeError::Execution)?;

        trace!(parent: &self.span, "resolved {domain} to {resolved:?}");

        if resolved.is_empty() {
            return Err(ProbeError::Execution(anyhow::anyhow!(
                "no IP address found for domain {domain}"
            )));
        }

        verify_ips(&self.config.expected_ips, &resolved).map_err(ProbeError::Execution)
    }

    fn base(&self) -> &BaseConfig {
        &self.config.base
    }

    fn kind(&self) -> &'static str {
        "dns"
    }

    fn summary(&self) -> String {
        self.config.base.summarize(&self.config.domain)
    }

    fn set_source(&mut self, source: ProbeSource) {
        self.config.base.source = source;
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }

    fn span(&self) -> &tracing::Span {
        &self.span
    }
}
