// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock state machine for exclusive course updates
//!
//! A course lock is held by exactly one token at a time. Unlike a heartbeat
//! lock it never expires on its own: whether a holder is still alive is a
//! question for the job runtime, and clearing a dead holder is an explicit
//! force-release.

use crate::clock::Clock;
use crate::course::CourseId;
use crate::event::Event;
use crate::token::LockToken;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A held lock as persisted by lock stores
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub course_id: CourseId,
    pub token: LockToken,
    pub acquired_at: DateTime<Utc>,
}

/// Lock state
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockState {
    /// Lock is available
    Free,
    /// Lock is held by the recorded token
    Held(LockRecord),
}

/// Exclusive lock guarding one course's updates
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CourseLock {
    pub course_id: CourseId,
    pub state: LockState,
}

/// Events that can trigger lock transitions
#[derive(Clone, Debug)]
pub enum LockInput {
    /// Attempt to acquire the lock
    Acquire { token: LockToken },
    /// Release the lock if `token` still owns it
    Release { token: LockToken },
    /// Clear the lock regardless of owner (orphan recovery only)
    ForceRelease,
}

impl CourseLock {
    pub fn new(course_id: CourseId) -> Self {
        Self {
            course_id,
            state: LockState::Free,
        }
    }

    /// Rebuild a lock from a stored record
    pub fn from_record(record: Option<LockRecord>, course_id: CourseId) -> Self {
        match record {
            Some(record) => Self {
                course_id,
                state: LockState::Held(record),
            },
            None => Self::new(course_id),
        }
    }

    /// Check if the lock is currently free
    pub fn is_free(&self) -> bool {
        matches!(self.state, LockState::Free)
    }

    /// Check if the lock is held by a specific token
    pub fn is_held_by(&self, token: &LockToken) -> bool {
        matches!(&self.state, LockState::Held(record) if &record.token == token)
    }

    /// Get the current record, if held
    pub fn record(&self) -> Option<&LockRecord> {
        match &self.state {
            LockState::Free => None,
            LockState::Held(record) => Some(record),
        }
    }

    /// Pure state transition function
    pub fn transition(&self, input: LockInput, clock: &impl Clock) -> (CourseLock, Vec<Event>) {
        let mut new_lock = self.clone();
        let mut events = Vec::new();
        let course_id = self.course_id;

        match input {
            LockInput::Acquire { token } => match &self.state {
                LockState::Free => {
                    new_lock.state = LockState::Held(LockRecord {
                        course_id,
                        token: token.clone(),
                        acquired_at: clock.utc_now(),
                    });
                    events.push(Event::LockAcquired { course_id, token });
                }
                LockState::Held(current) => {
                    events.push(Event::LockDenied {
                        course_id,
                        token,
                        current: current.token.clone(),
                    });
                }
            },

            LockInput::Release { token } => match &self.state {
                LockState::Held(current) if current.token == token => {
                    new_lock.state = LockState::Free;
                    events.push(Event::LockReleased { course_id, token });
                }
                _ => {
                    // Stale token or already free: a late holder must not
                    // clobber a newer lock
                }
            },

            LockInput::ForceRelease => {
                if let LockState::Held(current) = &self.state {
                    new_lock.state = LockState::Free;
                    events.push(Event::LockForceReleased {
                        course_id,
                        previous: current.token.clone(),
                    });
                }
            }
        }

        (new_lock, events)
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
