// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named job queues that update workers consume

mod spool;

pub use spool::SpoolJobQueue;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{EnqueueCall, FakeJobQueue};

use async_trait::async_trait;
use cu_core::{AttemptId, CourseId, LockToken};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One unit of update work, as handed to a worker
///
/// The token is the lock the scheduler acquired for this job; the worker
/// releases with it when done, and the job runtime reports liveness by it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateJob {
    pub course_id: CourseId,
    pub token: LockToken,
    pub attempt_id: AttemptId,
}

/// Errors from queue operations
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("queue {queue} rejected job: {reason}")]
    Rejected { queue: String, reason: String },
}

/// Adapter for the external work queue
#[async_trait]
pub trait JobQueue: Clone + Send + Sync + 'static {
    /// Append a job to the named queue
    async fn enqueue(&self, queue: &str, job: &UpdateJob) -> Result<(), QueueError>;
}
