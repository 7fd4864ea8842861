// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diagnostic events produced by locks and scheduling passes

use crate::course::CourseId;
use crate::history::AttemptId;
use crate::tier::QueueTier;
use crate::token::LockToken;
use serde::{Deserialize, Serialize};

/// Severity an event is reported at
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Events emitted by lock transitions and scheduling passes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    // Lock events
    LockAcquired {
        course_id: CourseId,
        token: LockToken,
    },
    LockDenied {
        course_id: CourseId,
        token: LockToken,
        current: LockToken,
    },
    LockReleased {
        course_id: CourseId,
        token: LockToken,
    },
    LockForceReleased {
        course_id: CourseId,
        previous: LockToken,
    },

    // Pass events
    OrphanLockCleared {
        course_id: CourseId,
        previous_token: LockToken,
        /// Attempt flagged as an orphan-lock failure
        attempt_id: AttemptId,
    },
    /// An unreadable lock record was removed
    CorruptLockCleared {
        course_id: CourseId,
        reason: String,
    },
    CourseEnqueued {
        course_id: CourseId,
        tier: QueueTier,
        attempt_id: AttemptId,
    },
    CourseUpdateFailed {
        course_id: CourseId,
        error: String,
    },
    PassSummary {
        short_count: usize,
        medium_count: usize,
        long_count: usize,
        orphan_count: usize,
        due_count: usize,
        in_flight_count: usize,
        contended_count: usize,
        failed_count: usize,
    },
    ShortUpdateLatencyWarning {
        elapsed_ms: u64,
        course_count: usize,
    },
    PassAborted {
        error: String,
    },
}

impl Event {
    /// Stable event name used by diagnostic sinks
    pub fn name(&self) -> &'static str {
        match self {
            Event::LockAcquired { .. } => "lock_acquired",
            Event::LockDenied { .. } => "lock_denied",
            Event::LockReleased { .. } => "lock_released",
            Event::LockForceReleased { .. } => "lock_force_released",
            Event::OrphanLockCleared { .. } => "orphan_lock_cleared",
            Event::CorruptLockCleared { .. } => "corrupt_lock_cleared",
            Event::CourseEnqueued { .. } => "course_enqueued",
            Event::CourseUpdateFailed { .. } => "course_update_failed",
            Event::PassSummary { .. } => "pass_summary",
            Event::ShortUpdateLatencyWarning { .. } => "short_update_latency_warning",
            Event::PassAborted { .. } => "pass_aborted",
        }
    }

    pub fn level(&self) -> EventLevel {
        match self {
            Event::LockAcquired { .. }
            | Event::LockDenied { .. }
            | Event::LockReleased { .. }
            | Event::CourseEnqueued { .. } => EventLevel::Debug,
            Event::PassSummary { .. } => EventLevel::Info,
            Event::LockForceReleased { .. }
            | Event::OrphanLockCleared { .. }
            | Event::CorruptLockCleared { .. }
            | Event::ShortUpdateLatencyWarning { .. } => EventLevel::Warn,
            Event::CourseUpdateFailed { .. } | Event::PassAborted { .. } => EventLevel::Error,
        }
    }

    /// Course this event concerns, if any
    pub fn course_id(&self) -> Option<CourseId> {
        match self {
            Event::LockAcquired { course_id, .. }
            | Event::LockDenied { course_id, .. }
            | Event::LockReleased { course_id, .. }
            | Event::LockForceReleased { course_id, .. }
            | Event::OrphanLockCleared { course_id, .. }
            | Event::CorruptLockCleared { course_id, .. }
            | Event::CourseEnqueued { course_id, .. }
            | Event::CourseUpdateFailed { course_id, .. } => Some(*course_id),
            Event::PassSummary { .. }
            | Event::ShortUpdateLatencyWarning { .. }
            | Event::PassAborted { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
