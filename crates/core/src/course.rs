// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Course records: the unit scheduled for periodic update

use crate::history::UpdateHistory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a course
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub u64);

impl fmt::Display for CourseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CourseId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(CourseId)
    }
}

/// Half-open interval `[start, end)` during which a course is running
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ActiveWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

/// A course and its scheduling state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub slug: String,
    pub window: ActiveWindow,
    /// Set by external actors to force an out-of-band update
    #[serde(default)]
    pub needs_update: bool,
    #[serde(default)]
    pub history: UpdateHistory,
}

impl Course {
    pub fn new(id: CourseId, slug: impl Into<String>, window: ActiveWindow) -> Self {
        Self {
            id,
            slug: slug.into(),
            window,
            needs_update: false,
            history: UpdateHistory::new(),
        }
    }

    pub fn with_needs_update(mut self, needs_update: bool) -> Self {
        self.needs_update = needs_update;
        self
    }

    pub fn with_history(mut self, history: UpdateHistory) -> Self {
        self.history = history;
        self
    }
}
