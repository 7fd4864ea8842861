// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue tiers and the duration classifier
//!
//! Courses whose updates run quickly go to a low-latency queue so that a few
//! slow courses cannot starve everything else. Unknown or recently broken
//! courses are biased to the fastest queue so failures resurface promptly.

use crate::history::DurationEstimate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Priority bucket, ordered by expected update duration ascending
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueTier {
    Short,
    Medium,
    Long,
}

impl QueueTier {
    pub const ALL: [QueueTier; 3] = [QueueTier::Short, QueueTier::Medium, QueueTier::Long];

    /// Name of the job queue that serves this tier
    pub fn queue_name(&self) -> &'static str {
        match self {
            QueueTier::Short => "short_update",
            QueueTier::Medium => "medium_update",
            QueueTier::Long => "long_update",
        }
    }
}

impl fmt::Display for QueueTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QueueTier::Short => "short",
            QueueTier::Medium => "medium",
            QueueTier::Long => "long",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ThresholdError {
    #[error("short threshold {short:?} exceeds medium threshold {medium:?}")]
    Inverted { short: Duration, medium: Duration },
}

/// Upper duration bounds for the Short and Medium tiers
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    #[serde(with = "humantime_serde")]
    pub short: Duration,
    #[serde(with = "humantime_serde")]
    pub medium: Duration,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            short: Duration::from_secs(60),
            medium: Duration::from_secs(600),
        }
    }
}

impl TierThresholds {
    pub fn new(short: Duration, medium: Duration) -> Result<Self, ThresholdError> {
        let thresholds = Self { short, medium };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.short > self.medium {
            return Err(ThresholdError::Inverted {
                short: self.short,
                medium: self.medium,
            });
        }
        Ok(())
    }

    /// Map an average duration to a tier; boundaries go to the faster tier
    pub fn tier_for(&self, average: Duration) -> QueueTier {
        if average <= self.short {
            QueueTier::Short
        } else if average <= self.medium {
            QueueTier::Medium
        } else {
            QueueTier::Long
        }
    }
}

/// Classify a course from its history estimate
pub fn classify(estimate: DurationEstimate, thresholds: &TierThresholds) -> QueueTier {
    match estimate {
        DurationEstimate::NoData | DurationEstimate::RecentFailure => QueueTier::Short,
        DurationEstimate::Average(average) => thresholds.tier_for(average),
    }
}

#[cfg(test)]
#[path = "tier_tests.rs"]
mod tests;
