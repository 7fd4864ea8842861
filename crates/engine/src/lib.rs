// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Course update scheduling engine

mod completion;
mod config;
mod error;
mod exclusivity;
mod pass;

pub use completion::finish_update;
pub use config::PassConfig;
pub use error::{ConfigError, PassError, SchedulerError};
pub use exclusivity::ExclusivityLock;
pub use pass::{PassDeps, SchedulingPass};
