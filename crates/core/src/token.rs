// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lock token generation
//!
//! Every acquisition attempt carries a fresh token. The token is what ties a
//! lock record to the job that owns it, so the job runtime can be asked
//! whether that owner is still alive.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Opaque owner token for one lock acquisition
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockToken(pub String);

impl LockToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LockToken {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Generates unique lock tokens
pub trait TokenGen: Clone + Send + Sync + 'static {
    fn next(&self) -> LockToken;
}

/// UUID-based token generator for production use
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidTokenGen;

impl TokenGen for UuidTokenGen {
    fn next(&self) -> LockToken {
        LockToken(uuid::Uuid::new_v4().to_string())
    }
}

/// Sequential token generator for testing
#[derive(Clone, Debug)]
pub struct SequentialTokenGen {
    prefix: String,
    counter: Arc<AtomicU64>,
}

impl SequentialTokenGen {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl Default for SequentialTokenGen {
    fn default() -> Self {
        Self::new("tok")
    }
}

impl TokenGen for SequentialTokenGen {
    fn next(&self) -> LockToken {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        LockToken(format!("{}-{}", self.prefix, n))
    }
}
