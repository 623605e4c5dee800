use std::net::{IpAddr, Ipv4Addr};

use tracing::trace;

use crate::probes::{DnsProbeConfig, HttpProbeConfig, Probe, ProbeConfig, TcpProbeConfig};

/// Control API settings
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ApiSettings {
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "crate::util::get_default_port")]
    pub port: u16,

    /// Bearer token required on every request (optional)
    pub token: Option<String>,

    #[serde(default = "default_cors")]
    pub cors: bool,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: crate::util::get_default_port(),
            token: None,
            cors: default_cors(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_cors() -> bool {
    true
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default, alias = "dns-checks")]
    pub dns_checks: Vec<DnsProbeConfig>,

    #[serde(default, alias = "tcp-checks")]
    pub tcp_checks: Vec<TcpProbeConfig>,

    #[serde(default, alias = "http-checks")]
    pub http_checks: Vec<HttpProbeConfig>,
}

impl Config {
    /// All statically configured probes, in file order per type
    pub fn probe_configs(&self) -> Vec<ProbeConfig> {
        let dns = self.dns_checks.iter().cloned().map(ProbeConfig::Dns);
        let tcp = self.tcp_checks.iter().cloned().map(ProbeConfig::Tcp);
        let http = self.http_checks.iter().cloned().map(ProbeConfig::Http);
        dns.chain(tcp).chain(http).collect()
    }

    pub fn probes(&self) -> Vec<Box<dyn Probe>> {
        self.probe_configs()
            .into_iter()
            .map(ProbeConfig::into_probe)
            .collect()
    }
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|e| anyhow::anyhow!("Invalid configuration file provided: {e}"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
