// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spool-file job queue for out-of-process workers
//!
//! Each queue is a JSONL file `<dir>/<queue>.jsonl`. Appends hold an
//! exclusive `fs2` lock on the file so concurrent schedulers never
//! interleave partial lines.

use super::{JobQueue, QueueError, UpdateJob};
use async_trait::async_trait;
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Job queue that appends JSON lines to per-queue spool files
#[derive(Clone, Debug)]
pub struct SpoolJobQueue {
    dir: PathBuf,
}

impl SpoolJobQueue {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, QueueError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, queue: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", queue))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read every job spooled to a queue, oldest first
    ///
    /// Lines that fail to parse are skipped.
    pub fn read_all(&self, queue: &str) -> Result<Vec<UpdateJob>, QueueError> {
        let path = self.path_for(queue);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(fs::File::open(&path)?);
        let mut jobs = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(job) => jobs.push(job),
                Err(e) => tracing::warn!(queue, error = %e, "skipping corrupt spool line"),
            }
        }
        Ok(jobs)
    }
}

#[async_trait]
impl JobQueue for SpoolJobQueue {
    async fn enqueue(&self, queue: &str, job: &UpdateJob) -> Result<(), QueueError> {
        let mut line = serde_json::to_string(job)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path_for(queue))?;
        file.lock_exclusive()?;
        let written = file.write_all(line.as_bytes()).and_then(|()| file.flush());
        let _ = FileExt::unlock(&file);
        written?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "spool_tests.rs"]
mod tests;
