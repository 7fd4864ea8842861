// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake diagnostic sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{DiagnosticSink, SinkError};
use async_trait::async_trait;
use cu_core::PassReport;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct FakeSinkState {
    reports: Vec<PassReport>,
    failing: bool,
}

/// Fake sink recording every flushed report
///
/// A failing sink still records the report it was handed, so tests can
/// check what a pass tried to flush.
#[derive(Clone, Debug, Default)]
pub struct FakeDiagnosticSink {
    inner: Arc<Mutex<FakeSinkState>>,
}

impl FakeDiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).failing = failing;
    }

    pub fn reports(&self) -> Vec<PassReport> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reports
            .clone()
    }

    pub fn last(&self) -> Option<PassReport> {
        self.reports().pop()
    }
}

#[async_trait]
impl DiagnosticSink for FakeDiagnosticSink {
    async fn flush(&self, report: &PassReport) -> Result<(), SinkError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.reports.push(report.clone());
        if inner.failing {
            return Err(SinkError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}
