// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: state directory layout and adapter wiring

use crate::config::{ConfigError, SchedulerConfig};
use cu_adapters::{
    FileLockStore, HeartbeatRuntime, JsonlSink, LockError, QueueError, RuntimeError, SinkError,
    SpoolJobQueue, TeeSink, TracedJobQueue, TracedJobRuntime, TracedLockStore, TracingSink,
};
use cu_core::{PassReport, SystemClock, UuidTokenGen};
use cu_engine::{PassDeps, PassError, SchedulingPass};
use cu_storage::{JsonCourseStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Scheduling pass with the daemon's concrete adapters (wrapped with tracing)
pub type DaemonPass = SchedulingPass<
    JsonCourseStore,
    TracedLockStore<FileLockStore>,
    TracedJobRuntime<HeartbeatRuntime>,
    TracedJobQueue<SpoolJobQueue>,
    TeeSink<TracingSink, JsonlSink>,
    SystemClock,
    UuidTokenGen,
>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("log path has no parent directory or file name")]
    BadLogPath,
    #[error("course store: {0}")]
    Store(#[from] StoreError),
    #[error("lock store: {0}")]
    Lock(#[from] LockError),
    #[error("job runtime: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("job queue: {0}")]
    Queue(#[from] QueueError),
    #[error("diagnostics: {0}")]
    Sink(#[from] SinkError),
    #[error("pass failed: {0}")]
    Pass(#[from] PassError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state during operation
pub struct DaemonState {
    pub config: SchedulerConfig,
    /// Shared so timer and manual passes can run concurrently
    pub pass: Arc<DaemonPass>,
}

impl DaemonState {
    /// Run one pass, logging its outcome
    pub async fn run_pass(&self) -> Result<PassReport, LifecycleError> {
        run_logged(&self.pass).await
    }
}

/// Run a pass and log its outcome
pub async fn run_logged(pass: &DaemonPass) -> Result<PassReport, LifecycleError> {
    match pass.run().await {
        Ok(report) => {
            info!(pass_id = %report.pass_id, "{}", report.summary_line());
            Ok(report)
        }
        Err(e) => {
            tracing::error!(pass_id = %e.report().pass_id, error = %e, "pass failed");
            Err(e.into())
        }
    }
}

/// Create the state directory layout and open every adapter
pub fn startup(config: &SchedulerConfig) -> Result<DaemonState, LifecycleError> {
    config.validate()?;
    let paths = &config.paths;
    std::fs::create_dir_all(&paths.state_dir)?;

    let store = JsonCourseStore::open(&paths.state_dir)?;
    let locks = FileLockStore::open(paths.locks_dir())?;
    let runtime = HeartbeatRuntime::open(paths.heartbeats_dir(), config.liveness.stale_threshold)?
        .with_queued_timeout(config.liveness.queued_timeout);
    let queue = SpoolJobQueue::open(paths.queues_dir())?;
    let sink = TeeSink::new(TracingSink::new(), JsonlSink::open(paths.diagnostics_path())?);

    let pass = SchedulingPass::new(
        PassDeps {
            store,
            locks: TracedLockStore::new(locks),
            runtime: TracedJobRuntime::new(runtime),
            queue: TracedJobQueue::new(queue),
            sink,
        },
        SystemClock,
        UuidTokenGen,
        config.pass_config(),
    );

    info!(
        state_dir = %paths.state_dir.display(),
        interval = ?config.schedule.interval,
        "daemon state opened"
    );

    Ok(DaemonState {
        config: config.clone(),
        pass: Arc::new(pass),
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
