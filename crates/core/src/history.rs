// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-course update history
//!
//! An append-only record of recent update attempts with a fixed retention
//! bound. The scheduler opens attempts, the worker closes them, and orphan
//! recovery annotates attempts whose owner died without closing them.

use crate::token::LockToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// How many attempts are retained per course
pub const MAX_UPDATE_LOGS: usize = 10;

/// Sequence number of an attempt, unique and increasing per course
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(pub u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a closed attempt ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed,
}

/// One execution record of an update job
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateAttempt {
    pub id: AttemptId,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub outcome: Option<AttemptOutcome>,
    /// Set when the attempt's lock was found orphaned and force-cleared
    #[serde(default)]
    pub orphan_lock_failure: bool,
    /// Lock token of the job that ran this attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<LockToken>,
}

impl UpdateAttempt {
    /// True while no end time has been recorded
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Wall-clock duration of a closed attempt
    ///
    /// Clock skew that puts the end before the start reads as zero.
    pub fn duration(&self) -> Option<Duration> {
        let end = self.end_time?;
        Some((end - self.start_time).to_std().unwrap_or(Duration::ZERO))
    }

    /// Whether this attempt ended badly: failed outright or orphaned
    pub fn is_failure(&self) -> bool {
        self.orphan_lock_failure || self.outcome == Some(AttemptOutcome::Failed)
    }

    fn counts_toward_average(&self) -> bool {
        !self.is_open() && !self.is_failure() && self.outcome == Some(AttemptOutcome::Succeeded)
    }
}

/// What the history says about expected update duration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DurationEstimate {
    /// No completed attempt to average
    NoData,
    /// The most recent closed attempt failed or was orphaned
    RecentFailure,
    /// Mean duration of recent successful attempts
    Average(Duration),
}

/// Errors from closing out attempts
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("unknown attempt: {0}")]
    UnknownAttempt(AttemptId),
    #[error("attempt already closed: {0}")]
    AlreadyClosed(AttemptId),
}

/// Bounded, append-only history of update attempts
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateHistory {
    /// Retained attempts, oldest first
    #[serde(default)]
    attempts: Vec<UpdateAttempt>,
    /// Highest attempt id ever issued, survives pruning
    #[serde(default)]
    last_id: u64,
}

impl UpdateHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retained attempts, oldest first
    pub fn attempts(&self) -> &[UpdateAttempt] {
        &self.attempts
    }

    pub fn get(&self, id: AttemptId) -> Option<&UpdateAttempt> {
        self.attempts.iter().find(|a| a.id == id)
    }

    pub fn latest(&self) -> Option<&UpdateAttempt> {
        self.attempts.last()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    /// The most recent attempt that has not been closed
    pub fn open_attempt(&self) -> Option<&UpdateAttempt> {
        self.attempts.iter().rev().find(|a| a.is_open())
    }

    /// Append a new open attempt, pruning beyond [`MAX_UPDATE_LOGS`]
    pub fn record_start(&mut self, at: DateTime<Utc>) -> AttemptId {
        self.push(at, None)
    }

    /// Append a new open attempt owned by the job holding `token`
    pub fn record_dispatch(&mut self, token: &LockToken, at: DateTime<Utc>) -> AttemptId {
        self.push(at, Some(token.clone()))
    }

    fn push(&mut self, at: DateTime<Utc>, token: Option<LockToken>) -> AttemptId {
        let highest = self.attempts.last().map(|a| a.id.0).unwrap_or(0);
        let id = AttemptId(self.last_id.max(highest) + 1);
        self.last_id = id.0;

        self.attempts.push(UpdateAttempt {
            id,
            start_time: at,
            end_time: None,
            outcome: None,
            orphan_lock_failure: false,
            token,
        });

        if self.attempts.len() > MAX_UPDATE_LOGS {
            let excess = self.attempts.len() - MAX_UPDATE_LOGS;
            self.attempts.drain(..excess);
        }

        id
    }

    /// Close an open attempt
    pub fn record_end(
        &mut self,
        id: AttemptId,
        outcome: AttemptOutcome,
        at: DateTime<Utc>,
    ) -> Result<(), HistoryError> {
        let attempt = self
            .attempts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(HistoryError::UnknownAttempt(id))?;

        if !attempt.is_open() {
            return Err(HistoryError::AlreadyClosed(id));
        }

        attempt.end_time = Some(at);
        attempt.outcome = Some(outcome);
        Ok(())
    }

    /// Record that the job holding `holder` died with its lock held
    ///
    /// The attempt is found by token, never by recency, so a newer job's
    /// attempt is left alone:
    /// - the holder's own open attempt is flagged and closed as Failed
    /// - an already closed attempt of the holder is returned unchanged
    /// - otherwise an open attempt without a token (written before attempts
    ///   carried tokens) is adopted, flagged and closed
    /// - when nothing matches (the holder died before recording its start)
    ///   a closed, flagged Failed attempt is appended for it
    ///
    /// Repeating the call for the same holder changes nothing.
    pub fn mark_orphan_failure(&mut self, holder: &LockToken, at: DateTime<Utc>) -> AttemptId {
        let owned = self
            .attempts
            .iter()
            .rposition(|a| a.token.as_ref() == Some(holder))
            .or_else(|| {
                self.attempts
                    .iter()
                    .rposition(|a| a.is_open() && a.token.is_none())
            });

        let index = match owned {
            Some(index) => index,
            None => {
                self.push(at, Some(holder.clone()));
                self.attempts.len() - 1
            }
        };

        let attempt = &mut self.attempts[index];
        attempt.token = Some(holder.clone());
        if attempt.is_open() {
            attempt.orphan_lock_failure = true;
            attempt.end_time = Some(at);
            attempt.outcome = Some(AttemptOutcome::Failed);
        }
        attempt.id
    }

    /// Mean duration of the last `window` successful, non-orphaned attempts
    pub fn average_duration(&self, window: usize) -> Option<Duration> {
        let durations: Vec<Duration> = self
            .attempts
            .iter()
            .rev()
            .filter(|a| a.counts_toward_average())
            .filter_map(UpdateAttempt::duration)
            .take(window)
            .collect();

        if durations.is_empty() {
            return None;
        }

        let total: Duration = durations.iter().sum();
        Some(total / durations.len() as u32)
    }

    /// Estimate used for queue classification
    pub fn duration_estimate(&self, window: usize) -> DurationEstimate {
        let last_closed = self.attempts.iter().rev().find(|a| !a.is_open());
        if last_closed.is_some_and(UpdateAttempt::is_failure) {
            return DurationEstimate::RecentFailure;
        }

        match self.average_duration(window) {
            Some(avg) => DurationEstimate::Average(avg),
            None => DurationEstimate::NoData,
        }
    }
}

#[cfg(test)]
#[path = "history_tests.rs"]
mod tests;
