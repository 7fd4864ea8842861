// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diagnostic sinks that receive each pass's report

mod jsonl;
mod log;

pub use jsonl::JsonlSink;
pub use log::TracingSink;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeDiagnosticSink;

use async_trait::async_trait;
use cu_core::PassReport;
use thiserror::Error;

/// Errors from flushing diagnostics
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for structured pass diagnostics
#[async_trait]
pub trait DiagnosticSink: Clone + Send + Sync + 'static {
    async fn flush(&self, report: &PassReport) -> Result<(), SinkError>;
}

/// Fan a report out to two sinks; both are attempted, the first error wins
#[derive(Clone, Debug)]
pub struct TeeSink<A, B> {
    first: A,
    second: B,
}

impl<A, B> TeeSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

#[async_trait]
impl<A: DiagnosticSink, B: DiagnosticSink> DiagnosticSink for TeeSink<A, B> {
    async fn flush(&self, report: &PassReport) -> Result<(), SinkError> {
        let first = self.first.flush(report).await;
        let second = self.second.flush(report).await;
        first.and(second)
    }
}
