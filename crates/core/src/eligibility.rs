// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Due-for-update predicate over course state

use crate::course::{Course, CourseId};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Why a course is due this pass
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Eligibility {
    /// Inside its active window
    Active,
    /// Outside its window but flagged for an out-of-band update
    Flagged,
}

/// Reason the course is due at `now`, or `None` if it is not
pub fn eligibility(course: &Course, now: DateTime<Utc>) -> Option<Eligibility> {
    if course.window.contains(now) {
        Some(Eligibility::Active)
    } else if course.needs_update {
        Some(Eligibility::Flagged)
    } else {
        None
    }
}

pub fn is_due(course: &Course, now: DateTime<Utc>) -> bool {
    eligibility(course, now).is_some()
}

/// Ids of every course due at `now`
pub fn due_courses<'a>(
    courses: impl IntoIterator<Item = &'a Course>,
    now: DateTime<Utc>,
) -> BTreeSet<CourseId> {
    courses
        .into_iter()
        .filter(|course| is_due(course, now))
        .map(|course| course.id)
        .collect()
}

#[cfg(test)]
#[path = "eligibility_tests.rs"]
mod tests;
