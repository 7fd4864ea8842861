// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sink that writes report events to the `tracing` subscriber

use super::{DiagnosticSink, SinkError};
use async_trait::async_trait;
use cu_core::{Event, EventLevel, PassReport};

/// Emits every event at its own level, then the summary line
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

fn emit(pass_id: &str, event: &Event) {
    let name = event.name();
    let course_id = event.course_id().map(|id| id.0);
    let fields = serde_json::to_string(event).unwrap_or_default();
    match event.level() {
        EventLevel::Debug => tracing::debug!(pass_id, event = name, course_id, %fields),
        EventLevel::Info => tracing::info!(pass_id, event = name, course_id, %fields),
        EventLevel::Warn => tracing::warn!(pass_id, event = name, course_id, %fields),
        EventLevel::Error => tracing::error!(pass_id, event = name, course_id, %fields),
    }
}

#[async_trait]
impl DiagnosticSink for TracingSink {
    async fn flush(&self, report: &PassReport) -> Result<(), SinkError> {
        for event in &report.events {
            emit(&report.pass_id, event);
        }
        tracing::info!("{}", report.summary_line());
        Ok(())
    }
}
