// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-course exclusivity with orphan detection
//!
//! Combines the keyed lock store with the job runtime. A held lock whose
//! owner token has no live job is orphaned. When liveness cannot be decided
//! (runtime error or timeout) the lock is treated as healthy: a slow runtime
//! must never cause a live job's lock to be stolen.

use cu_adapters::{JobRuntime, LockError, LockStore, RuntimeError};
use cu_core::{CourseId, LockRecord, LockToken};
use std::time::Duration;

/// Exclusivity lock over a lock store and a job runtime
#[derive(Clone)]
pub struct ExclusivityLock<L, R> {
    locks: L,
    runtime: R,
    liveness_timeout: Duration,
}

impl<L: LockStore, R: JobRuntime> ExclusivityLock<L, R> {
    pub fn new(locks: L, runtime: R, liveness_timeout: Duration) -> Self {
        Self {
            locks,
            runtime,
            liveness_timeout,
        }
    }

    /// Lock the course for `token` iff no lock exists
    pub async fn try_acquire(&self, course_id: CourseId, token: &LockToken) -> Result<bool, LockError> {
        self.locks.try_acquire(course_id, token).await
    }

    pub async fn is_held(&self, course_id: CourseId) -> Result<bool, LockError> {
        Ok(self.locks.current(course_id).await?.is_some())
    }

    /// The current holder, if any
    pub async fn holder(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError> {
        self.locks.current(course_id).await
    }

    /// Whether the course is locked by a token with no live job
    pub async fn is_orphaned(&self, course_id: CourseId) -> Result<bool, LockError> {
        match self.locks.current(course_id).await? {
            Some(record) => Ok(self.is_dead(&record).await),
            None => Ok(false),
        }
    }

    /// Whether the owner of `record` is known to be dead
    pub async fn is_dead(&self, record: &LockRecord) -> bool {
        let check = self.runtime.is_alive(&record.token);
        match tokio::time::timeout(self.liveness_timeout, check).await {
            Ok(Ok(alive)) => !alive,
            Ok(Err(e)) => {
                tracing::warn!(
                    course_id = %record.course_id,
                    token = %record.token,
                    error = %e,
                    "liveness check failed, assuming owner alive"
                );
                false
            }
            Err(_) => {
                tracing::warn!(
                    course_id = %record.course_id,
                    token = %record.token,
                    timeout_ms = self.liveness_timeout.as_millis() as u64,
                    "liveness check timed out, assuming owner alive"
                );
                false
            }
        }
    }

    /// Clear a dead holder's lock iff it still holds it
    ///
    /// Returns false when the lock has moved on (another scheduler already
    /// recovered it), in which case nothing was touched.
    pub async fn clear_orphan(&self, record: &LockRecord) -> Result<bool, LockError> {
        self.locks.release(record.course_id, &record.token).await
    }

    /// Delete the lock iff its record is unreadable
    ///
    /// An unreadable record has no owner to ask, so it is treated as orphaned.
    pub async fn clear_corrupt(&self, course_id: CourseId) -> Result<bool, LockError> {
        self.locks.clear_corrupt(course_id).await
    }

    /// Mark `token`'s job as queued and alive until its worker starts
    pub async fn register(&self, token: &LockToken) -> Result<(), RuntimeError> {
        self.runtime.register(token).await
    }

    pub async fn deregister(&self, token: &LockToken) -> Result<(), RuntimeError> {
        self.runtime.deregister(token).await
    }

    /// Delete the lock regardless of owner
    pub async fn force_release(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError> {
        self.locks.force_release(course_id).await
    }

    /// Delete the lock iff `token` owns it
    pub async fn release(&self, course_id: CourseId, token: &LockToken) -> Result<bool, LockError> {
        self.locks.release(course_id, token).await
    }
}

#[cfg(test)]
#[path = "exclusivity_tests.rs"]
mod tests;
