// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the scheduler's external collaborators

pub mod diagnostics;
pub mod liveness;
pub mod lock;
pub mod queue;
pub mod traced;

pub use diagnostics::{DiagnosticSink, JsonlSink, SinkError, TeeSink, TracingSink};
pub use liveness::{HeartbeatRuntime, JobRuntime, RuntimeError, DEFAULT_QUEUED_TIMEOUT};
pub use lock::{FileLockStore, LockError, LockStore, MemoryLockStore};
pub use queue::{JobQueue, QueueError, SpoolJobQueue, UpdateJob};
pub use traced::{TracedJobQueue, TracedJobRuntime, TracedLockStore};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use diagnostics::FakeDiagnosticSink;
#[cfg(any(test, feature = "test-support"))]
pub use liveness::FakeJobRuntime;
#[cfg(any(test, feature = "test-support"))]
pub use queue::{EnqueueCall, FakeJobQueue};
