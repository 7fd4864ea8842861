// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Course update daemon library: configuration and lifecycle

pub mod config;
pub mod lifecycle;

pub use config::{ConfigError, SchedulerConfig};
pub use lifecycle::{startup, DaemonPass, DaemonState, LifecycleError};
