// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::liveness::{JobRuntime, RuntimeError};
use crate::lock::{LockError, LockStore};
use crate::queue::{JobQueue, QueueError, UpdateJob};
use async_trait::async_trait;
use cu_core::{CourseId, LockRecord, LockToken};
use tracing::Instrument;

/// Wrapper that adds tracing to any JobQueue
#[derive(Clone)]
pub struct TracedJobQueue<Q> {
    inner: Q,
}

impl<Q> TracedJobQueue<Q> {
    pub fn new(inner: Q) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<Q: JobQueue> JobQueue for TracedJobQueue<Q> {
    async fn enqueue(&self, queue: &str, job: &UpdateJob) -> Result<(), QueueError> {
        let span = tracing::info_span!(
            "queue.enqueue",
            queue,
            course_id = %job.course_id,
            attempt_id = %job.attempt_id
        );

        async move {
            // Precondition: a job without an owner token could never release its lock
            if job.token.as_str().is_empty() {
                tracing::error!("job has empty lock token");
                return Err(QueueError::Rejected {
                    queue: queue.to_string(),
                    reason: "empty lock token".to_string(),
                });
            }

            let start = std::time::Instant::now();
            let result = self.inner.enqueue(queue, job).await;
            let elapsed = start.elapsed();

            match &result {
                Ok(()) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "job enqueued"),
                Err(e) => tracing::error!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "enqueue failed"
                ),
            }

            result
        }
        .instrument(span)
        .await
    }
}

/// Wrapper that adds tracing to any JobRuntime
#[derive(Clone)]
pub struct TracedJobRuntime<R> {
    inner: R,
}

impl<R> TracedJobRuntime<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: JobRuntime> JobRuntime for TracedJobRuntime<R> {
    async fn is_alive(&self, token: &LockToken) -> Result<bool, RuntimeError> {
        let start = std::time::Instant::now();
        let result = self.inner.is_alive(token).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(alive) => tracing::debug!(%token, alive, elapsed_ms, "liveness checked"),
            Err(e) => tracing::warn!(%token, elapsed_ms, error = %e, "liveness check failed"),
        }
        result
    }

    async fn register(&self, token: &LockToken) -> Result<(), RuntimeError> {
        let result = self.inner.register(token).await;
        match &result {
            Ok(()) => tracing::debug!(%token, "job registered"),
            Err(e) => tracing::warn!(%token, error = %e, "job registration failed"),
        }
        result
    }

    async fn deregister(&self, token: &LockToken) -> Result<(), RuntimeError> {
        let result = self.inner.deregister(token).await;
        if let Err(e) = &result {
            tracing::warn!(%token, error = %e, "job deregistration failed");
        }
        result
    }
}

/// Wrapper that adds tracing to any LockStore
#[derive(Clone)]
pub struct TracedLockStore<L> {
    inner: L,
}

impl<L> TracedLockStore<L> {
    pub fn new(inner: L) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<L: LockStore> LockStore for TracedLockStore<L> {
    async fn try_acquire(&self, course_id: CourseId, token: &LockToken) -> Result<bool, LockError> {
        let span = tracing::info_span!("lock.acquire", course_id = %course_id, %token);

        async move {
            let result = self.inner.try_acquire(course_id, token).await;
            match &result {
                Ok(true) => tracing::debug!("acquired"),
                // Contention is expected when passes overlap
                Ok(false) => tracing::debug!("already held"),
                Err(e) => tracing::error!(error = %e, "acquire failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn current(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError> {
        let result = self.inner.current(course_id).await;
        tracing::trace!(
            course_id = %course_id,
            held = ?result.as_ref().ok().map(Option::is_some),
            "checked"
        );
        result
    }

    async fn release(&self, course_id: CourseId, token: &LockToken) -> Result<bool, LockError> {
        let span = tracing::info_span!("lock.release", course_id = %course_id, %token);

        async move {
            let result = self.inner.release(course_id, token).await;
            match &result {
                Ok(true) => tracing::debug!("released"),
                Ok(false) => tracing::warn!("token no longer owns lock, release skipped"),
                Err(e) => tracing::error!(error = %e, "release failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn force_release(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError> {
        let span = tracing::info_span!("lock.force_release", course_id = %course_id);

        async move {
            let result = self.inner.force_release(course_id).await;
            match &result {
                Ok(Some(previous)) => {
                    tracing::warn!(previous = %previous.token, "lock force-released")
                }
                Ok(None) => tracing::debug!("nothing to release"),
                Err(e) => tracing::error!(error = %e, "force release failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn clear_corrupt(&self, course_id: CourseId) -> Result<bool, LockError> {
        let span = tracing::info_span!("lock.clear_corrupt", course_id = %course_id);

        async move {
            let result = self.inner.clear_corrupt(course_id).await;
            match &result {
                Ok(true) => tracing::warn!("corrupt lock record removed"),
                Ok(false) => tracing::debug!("lock record readable, kept"),
                Err(e) => tracing::error!(error = %e, "clearing corrupt lock failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
