// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake job queue for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{JobQueue, QueueError, UpdateJob};
use async_trait::async_trait;
use cu_core::CourseId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// Recorded enqueue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueCall {
    pub queue: String,
    pub job: UpdateJob,
}

#[derive(Debug, Default)]
struct FakeQueueState {
    calls: Vec<EnqueueCall>,
    failing_courses: HashSet<CourseId>,
    fail_all: bool,
}

/// Fake job queue recording every accepted job
#[derive(Clone, Debug, Default)]
pub struct FakeJobQueue {
    inner: Arc<Mutex<FakeQueueState>>,
}

impl FakeJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject jobs for one course
    pub fn fail_course(&self, course_id: CourseId) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.failing_courses.insert(course_id);
    }

    /// Reject every job
    pub fn fail_all(&self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).fail_all = true;
    }

    /// All accepted enqueues, in order
    pub fn calls(&self) -> Vec<EnqueueCall> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .calls
            .clone()
    }

    /// Accepted jobs for one queue
    pub fn jobs_in(&self, queue: &str) -> Vec<UpdateJob> {
        self.calls()
            .into_iter()
            .filter(|c| c.queue == queue)
            .map(|c| c.job)
            .collect()
    }

    /// Accepted jobs for one course
    pub fn jobs_for(&self, course_id: CourseId) -> Vec<EnqueueCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.job.course_id == course_id)
            .collect()
    }
}

#[async_trait]
impl JobQueue for FakeJobQueue {
    async fn enqueue(&self, queue: &str, job: &UpdateJob) -> Result<(), QueueError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.fail_all || inner.failing_courses.contains(&job.course_id) {
            return Err(QueueError::Rejected {
                queue: queue.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        inner.calls.push(EnqueueCall {
            queue: queue.to_string(),
            job: job.clone(),
        });
        Ok(())
    }
}
