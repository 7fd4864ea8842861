// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed lock store shared between scheduler processes
//!
//! Layout under the lock directory:
//! - `<course>.lock` holds the JSON `LockRecord` of the current owner
//! - `<course>.guard` is an advisory `fs2` lock serializing release paths
//!
//! Acquire writes the record to a private temp file and hard-links it into
//! place. `hard_link` fails when the target exists, which makes acquire a
//! compare-and-set on the filesystem.

use super::{LockError, LockStore};
use async_trait::async_trait;
use cu_core::{Clock, CourseId, LockRecord, LockToken, SystemClock};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Lock store keeping one file per held course lock
#[derive(Clone, Debug)]
pub struct FileLockStore<C: Clock = SystemClock> {
    dir: PathBuf,
    clock: C,
}

impl FileLockStore<SystemClock> {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, LockError> {
        Self::open_with_clock(dir, SystemClock)
    }
}

impl<C: Clock> FileLockStore<C> {
    pub fn open_with_clock(dir: impl Into<PathBuf>, clock: C) -> Result<Self, LockError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, clock })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn lock_path(&self, course_id: CourseId) -> PathBuf {
        self.dir.join(format!("{}.lock", course_id))
    }

    fn guard(&self, course_id: CourseId) -> Result<Guard, LockError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(format!("{}.guard", course_id)))?;
        file.lock_exclusive()?;
        Ok(Guard { file })
    }

    fn read(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError> {
        let json = match fs::read_to_string(self.lock_path(course_id)) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| LockError::Corrupt {
                course_id,
                reason: e.to_string(),
            })
    }

    fn remove(&self, course_id: CourseId) -> Result<(), LockError> {
        match fs::remove_file(self.lock_path(course_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

struct Guard {
    file: File,
}

impl Drop for Guard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[async_trait]
impl<C: Clock> LockStore for FileLockStore<C> {
    async fn try_acquire(&self, course_id: CourseId, token: &LockToken) -> Result<bool, LockError> {
        let record = LockRecord {
            course_id,
            token: token.clone(),
            acquired_at: self.clock.utc_now(),
        };
        let json = serde_json::to_string(&record).map_err(|e| LockError::Corrupt {
            course_id,
            reason: e.to_string(),
        })?;

        let tmp = self.dir.join(format!("{}.{}.tmp", course_id, token));
        fs::write(&tmp, json)?;
        let linked = fs::hard_link(&tmp, self.lock_path(course_id));
        let _ = fs::remove_file(&tmp);

        match linked {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn current(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError> {
        self.read(course_id)
    }

    async fn release(&self, course_id: CourseId, token: &LockToken) -> Result<bool, LockError> {
        let _guard = self.guard(course_id)?;
        match self.read(course_id)? {
            Some(record) if &record.token == token => {
                self.remove(course_id)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn force_release(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError> {
        let _guard = self.guard(course_id)?;
        let previous = match self.read(course_id) {
            Ok(record) => record,
            // An unreadable record still blocks the course, so clear it
            Err(LockError::Corrupt { .. }) => None,
            Err(e) => return Err(e),
        };
        self.remove(course_id)?;
        Ok(previous)
    }

    async fn clear_corrupt(&self, course_id: CourseId) -> Result<bool, LockError> {
        let _guard = self.guard(course_id)?;
        match self.read(course_id) {
            Err(LockError::Corrupt { .. }) => {
                self.remove(course_id)?;
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
