use anyhow::{Context, Result};
use std::time::Duration;

use crate::utils::RetryConfig;

// ============================================================================
// Service Configuration - read from the environment
// ============================================================================

#[derive(Debug, Clone)]
pub struct Config {
    pub scylla_nodes: Vec<String>,
    pub keyspace: String,
    pub connect_timeout: Duration,
    pub metrics_port: u16,
    pub dispatch_retry: RetryConfig,
    /// How far back the CDC reader starts when no checkpoint is newer
    pub cdc_start_lookback: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scylla_nodes: vec!["127.0.0.1:9042".to_string()],
            keyspace: "social_ks".to_string(),
            connect_timeout: Duration::from_secs(5),
            metrics_port: 9090,
            dispatch_retry: RetryConfig::aggressive(),
            // Default CDC log TTL
            cdc_start_lookback: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let scylla_nodes = match lookup("SCYLLA_NODES") {
            Some(nodes) => nodes
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.scylla_nodes,
        };
        if scylla_nodes.is_empty() {
            anyhow::bail!("SCYLLA_NODES must list at least one node");
        }

        let keyspace = lookup("SCYLLA_KEYSPACE").unwrap_or(defaults.keyspace);
        // Interpolated into CREATE KEYSPACE, so keep it a plain identifier
        if keyspace.is_empty() || !keyspace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            anyhow::bail!("Invalid SCYLLA_KEYSPACE: {:?}", keyspace);
        }

        let connect_timeout = match lookup("SCYLLA_CONNECT_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .with_context(|| format!("Invalid SCYLLA_CONNECT_TIMEOUT_SECS: {}", raw))?,
            ),
            None => defaults.connect_timeout,
        };

        let metrics_port = match lookup("METRICS_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("Invalid METRICS_PORT: {}", raw))?,
            None => defaults.metrics_port,
        };

        let mut dispatch_retry = defaults.dispatch_retry;
        if let Some(raw) = lookup("DISPATCH_MAX_ATTEMPTS") {
            dispatch_retry.max_attempts = raw
                .parse::<u32>()
                .with_context(|| format!("Invalid DISPATCH_MAX_ATTEMPTS: {}", raw))?;
            if dispatch_retry.max_attempts == 0 {
                anyhow::bail!("DISPATCH_MAX_ATTEMPTS must be at least 1");
            }
        }
        if let Some(raw) = lookup("DISPATCH_INITIAL_DELAY_MS") {
            dispatch_retry.initial_delay = Duration::from_millis(
                raw.parse::<u64>()
                    .with_context(|| format!("Invalid DISPATCH_INITIAL_DELAY_MS: {}", raw))?,
            );
        }

        let cdc_start_lookback = match lookup("CDC_START_LOOKBACK_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse::<u64>()
                    .with_context(|| format!("Invalid CDC_START_LOOKBACK_SECS: {}", raw))?,
            ),
            None => defaults.cdc_start_lookback,
        };

        Ok(Self {
            scylla_nodes,
            keyspace,
            connect_timeout,
            metrics_port,
            dispatch_retry,
            cdc_start_lookback,
        })
    }
}
