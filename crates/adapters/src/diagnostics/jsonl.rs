// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL diagnostic log
//!
//! One line per event: `{"pass_id":..,"at":..,"level":..,"event":..,<fields>}`.

use super::{DiagnosticSink, SinkError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cu_core::{Event, EventLevel, PassReport};
use fs2::FileExt;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Serialize)]
struct Record<'a> {
    pass_id: &'a str,
    at: DateTime<Utc>,
    level: EventLevel,
    #[serde(flatten)]
    event: &'a Event,
}

/// Diagnostic sink appending JSON lines to a file
#[derive(Clone, Debug)]
pub struct JsonlSink {
    path: PathBuf,
}

impl JsonlSink {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DiagnosticSink for JsonlSink {
    async fn flush(&self, report: &PassReport) -> Result<(), SinkError> {
        let mut buf = String::new();
        for event in &report.events {
            let record = Record {
                pass_id: &report.pass_id,
                at: report.started_at,
                level: event.level(),
                event,
            };
            buf.push_str(&serde_json::to_string(&record)?);
            buf.push('\n');
        }
        if buf.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.lock_exclusive()?;
        let written = file.write_all(buf.as_bytes()).and_then(|()| file.flush());
        let _ = FileExt::unlock(&file);
        written?;
        Ok(())
    }
}
