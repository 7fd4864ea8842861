// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process lock store driven by the `CourseLock` state machine

use super::{LockError, LockStore};
use async_trait::async_trait;
use cu_core::{Clock, CourseId, CourseLock, LockInput, LockRecord, LockToken, SystemClock};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Lock store shared between clones through an `Arc<Mutex<_>>`
#[derive(Clone, Debug)]
pub struct MemoryLockStore<C: Clock = SystemClock> {
    locks: Arc<Mutex<HashMap<CourseId, CourseLock>>>,
    clock: C,
}

impl MemoryLockStore<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for MemoryLockStore<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> MemoryLockStore<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Seed a lock directly, as a crashed worker would have left it
    pub fn insert(&self, record: LockRecord) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let course_id = record.course_id;
        locks.insert(course_id, CourseLock::from_record(Some(record), course_id));
    }

    /// Number of currently held locks
    pub fn held_count(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.values().filter(|l| !l.is_free()).count()
    }

    /// Apply one input to a course's lock and return the updated lock
    fn apply(&self, course_id: CourseId, input: LockInput) -> (CourseLock, CourseLock) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        let before = locks
            .get(&course_id)
            .cloned()
            .unwrap_or_else(|| CourseLock::new(course_id));
        let (after, events) = before.transition(input, &self.clock);
        for event in &events {
            tracing::trace!(event = event.name(), course_id = %course_id, "lock transition");
        }
        if after.is_free() {
            locks.remove(&course_id);
        } else {
            locks.insert(course_id, after.clone());
        }
        (before, after)
    }
}

#[async_trait]
impl<C: Clock> LockStore for MemoryLockStore<C> {
    async fn try_acquire(&self, course_id: CourseId, token: &LockToken) -> Result<bool, LockError> {
        let (_, after) = self.apply(
            course_id,
            LockInput::Acquire {
                token: token.clone(),
            },
        );
        Ok(after.is_held_by(token))
    }

    async fn current(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError> {
        let locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Ok(locks.get(&course_id).and_then(|l| l.record().cloned()))
    }

    async fn release(&self, course_id: CourseId, token: &LockToken) -> Result<bool, LockError> {
        let (before, after) = self.apply(
            course_id,
            LockInput::Release {
                token: token.clone(),
            },
        );
        Ok(!before.is_free() && after.is_free())
    }

    async fn force_release(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError> {
        let (before, _) = self.apply(course_id, LockInput::ForceRelease);
        Ok(before.record().cloned())
    }

    /// In-memory records are typed and never corrupt
    async fn clear_corrupt(&self, _course_id: CourseId) -> Result<bool, LockError> {
        Ok(false)
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
