// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Course store abstraction
//!
//! Stores own persistence only. Every history mutation goes through
//! [`CourseStore::update`], which applies a closure to the course atomically
//! with respect to other writers of the same course.

use chrono::{DateTime, Utc};
use cu_core::{
    AttemptId, AttemptOutcome, Course, CourseId, DurationEstimate, HistoryError, LockToken,
};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("course not found: {0}")]
    NotFound(CourseId),
    #[error("course {course_id}: {source}")]
    History {
        course_id: CourseId,
        source: HistoryError,
    },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence for courses and their update history
pub trait CourseStore: Clone + Send + Sync + 'static {
    /// Snapshot of every course
    fn list(&self) -> Result<Vec<Course>, StoreError>;

    fn get(&self, id: CourseId) -> Result<Course, StoreError>;

    /// Insert or replace a course
    fn put(&self, course: &Course) -> Result<(), StoreError>;

    /// Apply `f` to a course and persist the result
    fn update<R, F>(&self, id: CourseId, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Course) -> R;

    // === History operations ===

    fn record_start(&self, id: CourseId, at: DateTime<Utc>) -> Result<AttemptId, StoreError> {
        self.update(id, |course| course.history.record_start(at))
    }

    /// Open an attempt owned by the job holding `token`
    fn record_dispatch(
        &self,
        id: CourseId,
        token: &LockToken,
        at: DateTime<Utc>,
    ) -> Result<AttemptId, StoreError> {
        self.update(id, |course| course.history.record_dispatch(token, at))
    }

    fn record_end(
        &self,
        id: CourseId,
        attempt: AttemptId,
        outcome: AttemptOutcome,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.update(id, |course| course.history.record_end(attempt, outcome, at))?
            .map_err(|source| StoreError::History {
                course_id: id,
                source,
            })
    }

    /// Flag the attempt of a job that died holding `holder`
    fn mark_orphan_failure(
        &self,
        id: CourseId,
        holder: &LockToken,
        at: DateTime<Utc>,
    ) -> Result<AttemptId, StoreError> {
        self.update(id, |course| course.history.mark_orphan_failure(holder, at))
    }

    fn average_duration(&self, id: CourseId, window: usize) -> Result<Option<Duration>, StoreError> {
        Ok(self.get(id)?.history.average_duration(window))
    }

    fn duration_estimate(
        &self,
        id: CourseId,
        window: usize,
    ) -> Result<DurationEstimate, StoreError> {
        Ok(self.get(id)?.history.duration_estimate(window))
    }

    // === Flag operations ===

    fn set_needs_update(&self, id: CourseId, needs_update: bool) -> Result<(), StoreError> {
        self.update(id, |course| course.needs_update = needs_update)
    }

    fn clear_needs_update(&self, id: CourseId) -> Result<(), StoreError> {
        self.set_needs_update(id, false)
    }
}
