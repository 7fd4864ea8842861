// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side completion of an update job

use crate::error::SchedulerError;
use chrono::{DateTime, Utc};
use cu_adapters::{LockStore, UpdateJob};
use cu_core::AttemptOutcome;
use cu_storage::CourseStore;

/// Close the job's attempt and release its lock
///
/// The lock is released with the job's own token, so a zombie whose lock was
/// already cleared as orphaned cannot remove a newer job's lock. The release
/// is attempted even when closing the attempt fails. Returns whether this
/// call released the lock.
pub async fn finish_update<S: CourseStore, L: LockStore>(
    store: &S,
    locks: &L,
    job: &UpdateJob,
    outcome: AttemptOutcome,
    at: DateTime<Utc>,
) -> Result<bool, SchedulerError> {
    let ended = store.record_end(job.course_id, job.attempt_id, outcome, at);
    if let Err(e) = &ended {
        tracing::warn!(
            course_id = %job.course_id,
            attempt_id = %job.attempt_id,
            error = %e,
            "could not close attempt"
        );
    }

    let released = locks.release(job.course_id, &job.token).await?;
    if !released {
        tracing::debug!(
            course_id = %job.course_id,
            token = %job.token,
            "lock no longer owned by job"
        );
    }

    ended?;
    Ok(released)
}

#[cfg(test)]
#[path = "completion_tests.rs"]
mod tests;
