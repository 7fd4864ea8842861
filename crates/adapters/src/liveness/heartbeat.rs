// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat-file job runtime
//!
//! Workers touch `<dir>/<token>` while they run. A token is alive iff its
//! heartbeat file exists and was modified within the stale threshold.
//!
//! Before a worker picks the job up, the scheduler leaves a
//! `<dir>/<token>.queued` marker. A token with a marker but no heartbeat is
//! alive until the marker is older than the queued timeout. The first beat
//! removes the marker.

use super::{JobRuntime, RuntimeError};
use async_trait::async_trait;
use cu_core::LockToken;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// How long a queued job may wait for a worker by default
pub const DEFAULT_QUEUED_TIMEOUT: Duration = Duration::from_secs(60 * 60);

const QUEUED_SUFFIX: &str = "queued";

/// Liveness backed by heartbeat files
#[derive(Clone, Debug)]
pub struct HeartbeatRuntime {
    dir: PathBuf,
    stale_threshold: Duration,
    queued_timeout: Duration,
}

impl HeartbeatRuntime {
    pub fn open(dir: impl Into<PathBuf>, stale_threshold: Duration) -> Result<Self, RuntimeError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            stale_threshold,
            queued_timeout: DEFAULT_QUEUED_TIMEOUT,
        })
    }

    pub fn with_queued_timeout(mut self, queued_timeout: Duration) -> Self {
        self.queued_timeout = queued_timeout;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, token: &LockToken) -> PathBuf {
        self.dir.join(token.as_str())
    }

    fn queued_path_for(&self, token: &LockToken) -> PathBuf {
        self.dir.join(format!("{token}.{QUEUED_SUFFIX}"))
    }

    /// Record that the job owning `token` is alive now
    pub fn beat(&self, token: &LockToken) -> Result<(), RuntimeError> {
        fs::write(self.path_for(token), b"")?;
        remove_if_exists(&self.queued_path_for(token))
    }

    /// Remove the heartbeat of a finished job
    pub fn clear(&self, token: &LockToken) -> Result<(), RuntimeError> {
        remove_if_exists(&self.path_for(token))?;
        remove_if_exists(&self.queued_path_for(token))
    }
}

fn remove_if_exists(path: &Path) -> Result<(), RuntimeError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Age of the file at `path`, or None if it does not exist
fn age_of(path: &Path) -> Result<Option<Duration>, RuntimeError> {
    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let modified = metadata.modified()?;
    // A file from the future (clock skew) counts as fresh
    Ok(Some(
        SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO),
    ))
}

#[async_trait]
impl JobRuntime for HeartbeatRuntime {
    async fn is_alive(&self, token: &LockToken) -> Result<bool, RuntimeError> {
        if let Some(age) = age_of(&self.path_for(token))? {
            return Ok(age <= self.stale_threshold);
        }
        match age_of(&self.queued_path_for(token))? {
            Some(age) => Ok(age <= self.queued_timeout),
            None => Ok(false),
        }
    }

    async fn register(&self, token: &LockToken) -> Result<(), RuntimeError> {
        fs::write(self.queued_path_for(token), b"")?;
        Ok(())
    }

    async fn deregister(&self, token: &LockToken) -> Result<(), RuntimeError> {
        remove_if_exists(&self.queued_path_for(token))
    }
}
