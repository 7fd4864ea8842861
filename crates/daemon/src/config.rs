// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration loaded from TOML

use cu_adapters::DEFAULT_QUEUED_TIMEOUT;
use cu_core::TierThresholds;
use cu_engine::PassConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] cu_engine::ConfigError),
    #[error("schedule interval must be non-zero")]
    ZeroInterval,
    #[error("liveness stale threshold must be non-zero")]
    ZeroStaleThreshold,
    #[error("liveness queued timeout must be non-zero")]
    ZeroQueuedTimeout,
}

/// Top-level `cud` configuration
///
/// Every section is optional; missing sections and keys take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub paths: PathsConfig,
    pub schedule: ScheduleConfig,
    pub tiers: TierThresholds,
    pub history: HistoryConfig,
    pub liveness: LivenessConfig,
    pub latency_warning: LatencyWarningConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    /// Holds `courses/`, `locks/`, `heartbeats/` and `queues/`
    pub state_dir: PathBuf,
    /// Defaults to `<state_dir>/cud.log`
    pub log_path: Option<PathBuf>,
    /// Defaults to `<state_dir>/diagnostics.jsonl`
    pub diagnostics_path: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("/var/lib/cud"),
            log_path: None,
            diagnostics_path: None,
        }
    }
}

impl PathsConfig {
    pub fn log_path(&self) -> PathBuf {
        self.log_path
            .clone()
            .unwrap_or_else(|| self.state_dir.join("cud.log"))
    }

    pub fn diagnostics_path(&self) -> PathBuf {
        self.diagnostics_path
            .clone()
            .unwrap_or_else(|| self.state_dir.join("diagnostics.jsonl"))
    }

    pub fn locks_dir(&self) -> PathBuf {
        self.state_dir.join("locks")
    }

    pub fn heartbeats_dir(&self) -> PathBuf {
        self.state_dir.join("heartbeats")
    }

    pub fn queues_dir(&self) -> PathBuf {
        self.state_dir.join("queues")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Period between timer-driven passes
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HistoryConfig {
    pub window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: PassConfig::default().window,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LivenessConfig {
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Heartbeat age beyond which a worker counts as dead
    #[serde(with = "humantime_serde")]
    pub stale_threshold: Duration,
    /// How long a dispatched job may wait in its queue for a worker
    #[serde(with = "humantime_serde")]
    pub queued_timeout: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            timeout: PassConfig::default().liveness_timeout,
            stale_threshold: Duration::from_secs(120),
            queued_timeout: DEFAULT_QUEUED_TIMEOUT,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LatencyWarningConfig {
    #[serde(with = "humantime_serde")]
    pub base: Duration,
    #[serde(with = "humantime_serde")]
    pub per_course: Duration,
}

impl Default for LatencyWarningConfig {
    fn default() -> Self {
        let pass = PassConfig::default();
        Self {
            base: pass.latency_base,
            per_course: pass.latency_per_course,
        }
    }
}

impl SchedulerConfig {
    /// Read and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&text)?;
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.interval.is_zero() {
            return Err(ConfigError::ZeroInterval);
        }
        if self.liveness.stale_threshold.is_zero() {
            return Err(ConfigError::ZeroStaleThreshold);
        }
        if self.liveness.queued_timeout.is_zero() {
            return Err(ConfigError::ZeroQueuedTimeout);
        }
        self.pass_config().validate()?;
        Ok(())
    }

    pub fn pass_config(&self) -> PassConfig {
        PassConfig {
            thresholds: self.tiers,
            window: self.history.window,
            liveness_timeout: self.liveness.timeout,
            latency_base: self.latency_warning.base,
            latency_per_course: self.latency_warning.per_course,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
