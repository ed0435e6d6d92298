//! Runtime configuration, read once from the environment at startup.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{Context, Result};
use cricket_scraper::ScraperConfig;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Answer scrape failures with 502 instead of an empty 200 list.
    pub strict_errors: bool,
    pub scraper: ScraperConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            strict_errors: false,
            scraper: ScraperConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, with the variable source injected.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = ScraperConfig::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match var("PORT") {
            Some(v) => v.parse::<u16>().with_context(|| format!("Invalid PORT {v:?}"))?,
            None => DEFAULT_PORT,
        };

        let strict_errors = match var("CRICBUDDY_STRICT_ERRORS") {
            Some(v) => parse_flag(&v).with_context(|| format!("Invalid CRICBUDDY_STRICT_ERRORS {v:?}"))?,
            None => false,
        };

        let browser_timeout = match var("CRICBUDDY_BROWSER_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.parse::<u64>()
                    .with_context(|| format!("Invalid CRICBUDDY_BROWSER_TIMEOUT_SECS {v:?}"))?,
            ),
            None => defaults.browser_timeout,
        };

        let max_concurrent_browsers = match var("CRICBUDDY_MAX_BROWSERS") {
            Some(v) => v
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("Invalid CRICBUDDY_MAX_BROWSERS {v:?}, expected a positive number"))?,
            None => defaults.max_concurrent_browsers,
        };

        Ok(Self {
            port,
            strict_errors,
            scraper: ScraperConfig {
                live_url: var("CRICBUDDY_LIVE_URL").unwrap_or(defaults.live_url),
                upcoming_url: var("CRICBUDDY_UPCOMING_URL").unwrap_or(defaults.upcoming_url),
                site_origin: var("CRICBUDDY_SITE_ORIGIN").unwrap_or(defaults.site_origin),
                browser_timeout,
                max_concurrent_browsers,
                ..defaults
            },
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => anyhow::bail!("expected true/false, got {other:?}"),
    }
}
