// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed lock stores for per-course exclusivity

mod file;
mod memory;

pub use file::FileLockStore;
pub use memory::MemoryLockStore;

use async_trait::async_trait;
use cu_core::{CourseId, LockRecord, LockToken};
use thiserror::Error;

/// Errors from lock store operations
#[derive(Debug, Error)]
pub enum LockError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt lock record for course {course_id}: {reason}")]
    Corrupt { course_id: CourseId, reason: String },
}

/// Atomic per-course lock primitive
///
/// Every operation is linearizable per course. Operations on different
/// courses never block each other beyond a short critical section.
#[async_trait]
pub trait LockStore: Clone + Send + Sync + 'static {
    /// Write a record for `token` iff no lock exists; returns whether it did
    async fn try_acquire(&self, course_id: CourseId, token: &LockToken) -> Result<bool, LockError>;

    /// The current holder, if any
    async fn current(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError>;

    /// Delete the lock iff `token` owns it; returns whether it did
    async fn release(&self, course_id: CourseId, token: &LockToken) -> Result<bool, LockError>;

    /// Delete the lock regardless of owner, returning the cleared record
    async fn force_release(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError>;

    /// Delete the lock iff its record cannot be read; returns whether it did
    async fn clear_corrupt(&self, course_id: CourseId) -> Result<bool, LockError>;
}
