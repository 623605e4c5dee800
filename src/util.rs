use std::net::IpAddr;

use crate::config::ApiSettings;

const HEALTHD_PORT: &str = "HEALTHD_PORT";

const DEFAULT_PORT: u16 = 9013;

pub fn get_default_port() -> u16 {
    DEFAULT_PORT
}

pub fn get_port() -> Option<u16> {
    std::env::var(HEALTHD_PORT)
        .ok()
        .and_then(|port| port.parse().ok())
}

const HEALTHD_ADDR: &str = "HEALTHD_ADDR";

pub fn get_addr() -> Option<IpAddr> {
    std::env::var(HEALTHD_ADDR)
        .ok()
        .and_then(|addr| addr.parse().ok())
}

const HEALTHD_TOKEN: &str = "HEALTHD_TOKEN";

pub fn get_token() -> Option<String> {
    std::env::var(HEALTHD_TOKEN).ok()
}

/// Environment variables take precedence over the configuration file
pub fn apply_env_overrides(settings: &mut ApiSettings) {
    if let Some(addr) = get_addr() {
        settings.host = addr;
    }
    if let Some(port) = get_port() {
        settings.port = port;
    }
    if let Some(token) = get_token() {
        settings.token = Some(token);
    }
}
