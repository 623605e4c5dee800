//! HTTP probe - sends one request and checks the response status
//!
//! The response body is drained chunk by chunk and never kept in memory.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{ProbeError, ProbeResult};

use super::{BaseConfig, Probe, ProbeSource, duration};

fn default_timeout() -> Duration {
    Duration::from_secs(5)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Head,
    Put,
    Delete,
}

impl HttpMethod {
    fn as_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpProbeConfig {
    #[serde(flatten)]
    pub base: BaseConfig,

    pub url: String,

    #[serde(default)]
    pub method: HttpMethod,

    /// Accepted status codes. Empty means any 2xx.
    #[serde(default, alias = "valid-status")]
    pub expected_status: Vec<u16>,

    #[serde(default = "default_timeout", with = "duration")]
    pub timeout: Duration,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// State prepared by `initialize`
struct PreparedRequest {
    client: reqwest::Client,
    url: reqwest::Url,
    headers: HeaderMap,
}

pub struct HttpProbe {
    config: HttpProbeConfig,
    prepared: Option<PreparedRequest>,
    span: tracing::Span,
}

impl HttpProbe {
    pub fn new(config: HttpProbeConfig) -> Self {
        let span = tracing::info_span!(
            "probe",
            name = %config.base.name,
            url = %config.url
        );
        Self {
            config,
            prepared: None,
            span,
        }
    }

    fn prepare(&self) -> anyhow::Result<PreparedRequest> {
        let url = reqwest::Url::parse(&self.config.url)
            .with_context(|| format!("invalid URL {}", self.config.url))?;
        if !matches!(url.scheme(), "http" | "https") {
            anyhow::bail!("unsupported URL scheme {}", url.scheme());
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &self.config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name {name}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid value for header {name}"))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(PreparedRequest {
            client,
            url,
            headers,
        })
    }

    fn status_accepted(&self, status: reqwest::StatusCode) -> bool {
        if self.config.expected_status.is_empty() {
            status.is_success()
        } else {
            self.config.expected_status.contains(&status.as_u16())
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    fn validate(&self) -> ProbeResult<()> {
        self.config.base.validate()?;
        if self.config.url.trim().is_empty() {
            return Err(ProbeError::validation("the probe URL is missing"));
        }
        if self.config.timeout.is_zero() {
            return Err(ProbeError::validation("the probe timeout should not be zero"));
        }
        Ok(())
    }

    fn initialize(&mut self) -> ProbeResult<()> {
        let prepared = self.prepare().map_err(ProbeError::Initialization)?;
        self.prepared = Some(prepared);
        Ok(())
    }

    async fn execute(&self) -> ProbeResult<()> {
        let prepared = self
            .prepared
            .as_ref()
            .context("probe is not initialized")
            .map_err(ProbeError::Execution)?;

        let mut request = prepared
            .client
            .request(self.config.method.as_reqwest(), prepared.url.clone())
            .headers(prepared.headers.clone());
        if let Some(body) = &self.config.body {
            request = request.body(body.clone());
        }

        let mut response = request
            .send()
            .await
            .with_context(|| format!("HTTP request to {} failed", prepared.url))
            .map_err(ProbeError::Execution)?;
        let status = response.status();

        while response
            .chunk()
            .await
            .context("failed to read response body")
            .map_err(ProbeError::Execution)?
            .is_some()
        {}

        trace!(parent: &self.span, "received status {status}");

        if !self.status_accepted(status) {
            return Err(ProbeError::Execution(anyhow::anyhow!(
                "unexpected status code {}",
                status.as_u16()
            )));
        }
        Ok(())
    }

    fn base(&self) -> &BaseConfig {
        &self.config.base
    }

    fn kind(&self) -> &'static str {
        "http"
    }

    fn summary(&self) -> String {
        let target = format!(
            "{} {}",
            self.config.method.as_reqwest(),
            self.config.url
        );
        self.config.base.summarize(&target)
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
