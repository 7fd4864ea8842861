// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordination primitives for per-course exclusivity
//!
//! This module provides:
//! - **CourseLock** - Exclusive access keyed by course with owner tokens
//! - **LockRecord** - The persisted form lock stores read and write

pub mod lock;

pub use lock::{CourseLock, LockInput, LockRecord, LockState};
