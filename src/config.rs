//! Dashboard server configuration read from `KTOP_*` environment variables.
//!
//! Invalid values are ignored and the default is kept. An overridden listing
//! URL is also sent as the referer.

use std::env;
use std::net::SocketAddr;

use crate::fetcher::FetcherConfig;
use crate::market::parse_field_set;

pub const DEFAULT_DASHBOARD_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub addr: SocketAddr,
    pub fetcher: FetcherConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            fetcher: FetcherConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let value = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        if let Some(addr) = value("KTOP_DASHBOARD_ADDR").and_then(|raw| raw.parse().ok()) {
            config.addr = addr;
        }

        if let Some(base_url) = value("KTOP_LISTING_URL") {
            config.fetcher.referer = base_url.clone();
            config.fetcher.base_url = base_url;
        }

        if let Some(field_set) = value("KTOP_FIELD_SET").and_then(|raw| parse_field_set(&raw).ok())
        {
            config.fetcher.field_set = field_set;
        }

        if let Some(timeout_ms) = value("KTOP_HTTP_TIMEOUT_MS")
            .and_then(|raw| raw.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            config.fetcher.http_timeout_ms = Some(timeout_ms);
        }

        config
    }
}

pub fn dashboard_config_from_env() -> DashboardConfig {
    DashboardConfig::from_lookup(|key| env::var(key).ok())
}
