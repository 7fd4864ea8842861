// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tuning knobs for a scheduling pass

use crate::error::ConfigError;
use cu_core::TierThresholds;
use std::time::Duration;

/// Pass configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassConfig {
    pub thresholds: TierThresholds,
    /// Number of recent successful attempts averaged for classification
    pub window: usize,
    /// Bound on each job-runtime liveness query
    pub liveness_timeout: Duration,
    /// Latency warning fires above `latency_base + latency_per_course * due`
    pub latency_base: Duration,
    pub latency_per_course: Duration,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            thresholds: TierThresholds::default(),
            window: 3,
            liveness_timeout: Duration::from_secs(5),
            latency_base: Duration::from_secs(30),
            latency_per_course: Duration::from_millis(250),
        }
    }
}

impl PassConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.liveness_timeout.is_zero() {
            return Err(ConfigError::ZeroLivenessTimeout);
        }
        self.thresholds.validate()?;
        Ok(())
    }

    /// Elapsed time above which a pass over `due` courses is reported slow
    pub fn latency_threshold(&self, due: usize) -> Duration {
        let per_course = self
            .latency_per_course
            .saturating_mul(u32::try_from(due).unwrap_or(u32::MAX));
        self.latency_base.saturating_add(per_course)
    }
}
