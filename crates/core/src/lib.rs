// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! cu-core: Core domain for the course update scheduler
//!
//! This crate provides:
//! - Course records with active windows and update history
//! - The queue-tier classifier and eligibility predicate
//! - A pure lock state machine for per-course exclusivity
//! - Diagnostic events and the per-pass report

pub mod clock;
pub mod token;

pub mod coordination;
pub mod course;
pub mod eligibility;
pub mod event;
pub mod history;
pub mod report;
pub mod tier;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use coordination::{CourseLock, LockInput, LockRecord, LockState};
pub use course::{ActiveWindow, Course, CourseId};
pub use eligibility::{due_courses, eligibility, is_due, Eligibility};
pub use event::{Event, EventLevel};
pub use history::{
    AttemptId, AttemptOutcome, DurationEstimate, HistoryError, UpdateAttempt, UpdateHistory,
    MAX_UPDATE_LOGS,
};
pub use report::{PassReport, PassSummary};
pub use tier::{classify, QueueTier, ThresholdError, TierThresholds};
pub use token::{LockToken, SequentialTokenGen, TokenGen, UuidTokenGen};
