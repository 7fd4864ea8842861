// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job runtime liveness: is the owner of a lock token still running?

mod heartbeat;

pub use heartbeat::{HeartbeatRuntime, DEFAULT_QUEUED_TIMEOUT};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeJobRuntime;

use async_trait::async_trait;
use cu_core::LockToken;
use thiserror::Error;

/// Errors from liveness queries
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("runtime unavailable: {0}")]
    Unavailable(String),
}

/// Adapter for the worker runtime's job tracking
#[async_trait]
pub trait JobRuntime: Clone + Send + Sync + 'static {
    /// Whether a live job is currently running (or waiting to run) under `token`
    async fn is_alive(&self, token: &LockToken) -> Result<bool, RuntimeError>;

    /// Announce a job handed to a queue that has not started yet
    ///
    /// A registered token counts as alive until its worker takes over.
    async fn register(&self, token: &LockToken) -> Result<(), RuntimeError>;

    /// Withdraw a registration whose job never reached its queue
    async fn deregister(&self, token: &LockToken) -> Result<(), RuntimeError>;
}
