//! Tunables for fetching, classification and batch checks.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: f64,

    /// Overrides the default browser-like user agent.
    pub user_agent: Option<String>,

    /// Skips TLS certificate verification. Off unless asked for.
    pub accept_invalid_certs: bool,

    pub max_redirects: usize,

    /// Bytes of body kept per response; the rest is discarded.
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10.0,
            user_agent: None,
            accept_invalid_certs: false,
            max_redirects: 10,
            max_body_bytes: 5 * 1024 * 1024,
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs.max(0.0))
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .unwrap_or(DEFAULT_USER_AGENT)
    }
}

/// Boundaries used to turn a fetch outcome into a liveness value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UptimeThresholds {
    /// Responses at or above this many seconds are `slow`.
    pub slow_after_secs: f64,
    pub healthy_status_min: u16,
    pub healthy_status_max: u16,
}

impl Default for UptimeThresholds {
    fn default() -> Self {
        Self {
            slow_after_secs: 2.0,
            healthy_status_min: 200,
            healthy_status_max: 399,
        }
    }
}

impl UptimeThresholds {
    pub fn is_healthy_status(&self, status: u16) -> bool {
        (self.healthy_status_min..=self.healthy_status_max).contains(&status)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub fetch: FetchConfig,
    pub uptime: UptimeThresholds,

    /// Upper bound on checks running at once during `run_all_active`.
    pub max_concurrent_checks: usize,

    /// Outbound links probed per check to count broken links. 0 disables it.
    pub broken_link_sample: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            uptime: UptimeThresholds::default(),
            max_concurrent_checks: 8,
            broken_link_sample: 5,
        }
    }
}

impl MonitorConfig {
    /// Defaults overridden by `SITEWATCH_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = MonitorConfig::default();

        if let Some(secs) = env_parse::<f64>("SITEWATCH_TIMEOUT_SECS") {
            config.fetch.timeout_secs = secs;
        }
        if let Ok(ua) = env::var("SITEWATCH_USER_AGENT") {
            config.fetch.user_agent = Some(ua);
        }
        if let Ok(insecure) = env::var("SITEWATCH_INSECURE") {
            config.fetch.accept_invalid_certs = insecure.eq_ignore_ascii_case("true");
        }
        if let Some(bytes) = env_parse::<usize>("SITEWATCH_MAX_BODY_BYTES") {
            config.fetch.max_body_bytes = bytes;
        }
        if let Some(secs) = env_parse::<f64>("SITEWATCH_SLOW_AFTER_SECS") {
            config.uptime.slow_after_secs = secs;
        }
        if let Some(n) = env_parse::<usize>("SITEWATCH_CONCURRENCY") {
            config.max_concurrent_checks = n;
        }
        if let Some(n) = env_parse::<usize>("SITEWATCH_LINK_SAMPLE") {
            config.broken_link_sample = n;
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fetch.timeout_secs.is_finite() && self.fetch.timeout_secs > 0.0) {
            return Err("fetch timeout must be a positive number of seconds".into());
        }
        if !(self.uptime.slow_after_secs.is_finite() && self.uptime.slow_after_secs >= 0.0) {
            return Err("slow threshold cannot be negative".into());
        }
        if self.uptime.healthy_status_min > self.uptime.healthy_status_max {
            return Err(format!(
                "healthy status range {}..={} is empty",
                self.uptime.healthy_status_min, self.uptime.healthy_status_max
            )
            .into());
        }
        if self.max_concurrent_checks == 0 {
            return Err("max_concurrent_checks must be at least 1".into());
        }
        if self.fetch.max_body_bytes == 0 {
            return Err("max_body_bytes must be at least 1".into());
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|raw| raw.trim().parse().ok())
}
