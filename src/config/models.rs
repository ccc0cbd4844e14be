// src/config/models.rs
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Period applied to every service registered through the monitor.
    #[serde(default = "default_check_period_ms")]
    pub check_period_ms: u64,

    #[serde(default)]
    pub sink: SinkConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub checks: Vec<HttpCheckConfig>,
}

impl Config {
    pub fn check_period(&self) -> Duration {
        Duration::from_millis(self.check_period_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for check in &self.checks {
            if check.name.trim().is_empty() {
                bail!("Check for {} has an empty name", check.url);
            }
            if !names.insert(check.name.as_str()) {
                bail!("Check [{}] is configured more than once", check.name);
            }
            if check.timeout_secs == 0 {
                bail!("Check [{}] must have a non-zero timeout", check.name);
            }
        }

        if let SinkConfig::Relay(relay) = &self.sink {
            if relay.timeout_secs == 0 {
                bail!("Relay sink must have a non-zero timeout");
            }
            relay.retry.validate()?;
        }

        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            bail!("Metrics path must start with '/': {}", self.metrics.path);
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Development mode: statuses are only logged.
    #[default]
    Log,
    Relay(RelayConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub url: Url,

    /// Host the passive checks are submitted for. Falls back to `$HOSTNAME`.
    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

impl RelayConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl RetryConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            bail!("Retry max_attempts must be at least 1");
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            bail!(
                "Retry backoff_base_ms ({}) exceeds backoff_max_ms ({})",
                self.backoff_base_ms,
                self.backoff_max_ms
            );
        }
        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

/// An HTTP endpoint polled by the built-in `HttpCheck`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpCheckConfig {
    pub name: String,
    pub url: Url,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Responses slower than this report WARNING instead of OK.
    #[serde(default)]
    pub warn_latency_ms: Option<u64>,
}

impl HttpCheckConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn warn_latency(&self) -> Option<Duration> {
        self.warn_latency_ms.map(Duration::from_millis)
    }
}

fn default_check_period_ms() -> u64 {
    60_000
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    100
}

fn default_backoff_max_ms() -> u64 {
    2_000
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}
