// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for scheduling passes

use cu_adapters::{LockError, QueueError, RuntimeError, SinkError};
use cu_core::{PassReport, ThresholdError};
use cu_storage::StoreError;
use thiserror::Error;

/// A failure confined to one course; the pass reports it and moves on
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
    #[error("job runtime error: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

/// A failure that ends the pass
///
/// Carries everything the pass gathered before failing, so the caller can
/// still inspect or persist it.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("course scan failed: {source}")]
    Scan {
        source: StoreError,
        report: Box<PassReport>,
    },
    #[error("diagnostic flush failed: {source}")]
    Flush {
        source: SinkError,
        report: Box<PassReport>,
    },
}

impl PassError {
    /// Diagnostics gathered before the failure
    pub fn report(&self) -> &PassReport {
        match self {
            PassError::Scan { report, .. } | PassError::Flush { report, .. } => report,
        }
    }
}

/// Invalid pass configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("history window must be at least 1")]
    ZeroWindow,
    #[error("liveness timeout must be non-zero")]
    ZeroLivenessTimeout,
    #[error(transparent)]
    Thresholds(#[from] ThresholdError),
}
