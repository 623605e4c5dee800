//! TCP probe - checks that a connection to `target:port` can be established

use std::net::Ipv6Addr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tracing::trace;

use crate::error::{ProbeError, ProbeResult};

use super::{BaseConfig, Probe, ProbeSource, duration};

fn default_timeout() -> Duration {
    Duration::from_secs(2)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcpProbeConfig {
    #[serde(flatten)]
    pub base: BaseConfig,

    /// Host name or IP address
    pub target: String,

    pub port: u16,

    #[serde(default = "default_timeout", with = "duration")]
    pub timeout: Duration,
}

pub struct TcpProbe {
    config: TcpProbeConfig,
    address: Option<String>,
    span: tracing::Span,
}

impl TcpProbe {
    pub fn new(config: TcpProbeConfig) -> Self {
        let span = tracing::info_span!(
            "probe",
            name = %config.base.name,
            target = %config.target,
            port = config.port
        );
        Self {
            config,
            address: None,
            span,
        }
    }

    fn target(&self) -> String {
        let host = &self.config.target;
        if host.parse::<Ipv6Addr>().is_ok() {
            format!("[{host}]:{}", self.config.port)
        } else {
            format!("{host}:{}", self.config.port)
        }
    }
}

#[async_trait]
impl Probe for TcpProbe {
    fn validate(&self) -> ProbeResult<()> {
        self.config.base.validate()?;
        if self.config.target.trim().is_empty() {
            return Err(ProbeError::validation("the probe target is missing"));
        }
        if self.config.port == 0 {
            return Err(ProbeError::validation("the probe port is missing"));
        }
        if self.config.timeout.is_zero() {
            return Err(ProbeError::validation("the probe timeout should not be zero"));
        }
        Ok(())
    }

    fn initialize(&mut self) -> ProbeResult<()> {
        self.address = Some(self.target());
        Ok(())
    }

    async fn execute(&self) -> ProbeResult<()> {
        let address = self
            .address
            .as_deref()
            .context("probe is not initialized")
            .map_err(ProbeError::Execution)?;
        let timeout = self.config.timeout;

        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| {
                ProbeError::Execution(anyhow::anyhow!(
                    "connection to {address} timed out after {}",
                    duration::format_duration(&timeout)
                ))
            })?
            .with_context(|| format!("failed to connect to {address}"))
            .map_err(ProbeError::Execution)?;

        trace!(parent: &self.span, "connected to {address}");
        drop(stream);

        Ok(())
    }

    fn base(&self) -> &BaseConfig {
        &self.config.base
    }

    fn kind(&self) -> &'static str {
        "tcp"
    }

    fn summary(&self) -> String {
        self.config.base.summarize(&self.target())
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
