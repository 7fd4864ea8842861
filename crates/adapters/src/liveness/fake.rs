// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake job runtime for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{JobRuntime, RuntimeError};
use async_trait::async_trait;
use cu_core::LockToken;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Default)]
struct FakeRuntimeState {
    live: HashSet<LockToken>,
    delay: Option<Duration>,
    unavailable: bool,
    queries: Vec<LockToken>,
    registered: Vec<LockToken>,
}

/// Fake job runtime with settable live tokens
///
/// Tokens are dead unless marked alive or registered.
#[derive(Clone, Debug, Default)]
pub struct FakeJobRuntime {
    inner: Arc<Mutex<FakeRuntimeState>>,
}

impl FakeJobRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_alive(&self, token: &LockToken) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.live.insert(token.clone());
    }

    pub fn set_dead(&self, token: &LockToken) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.live.remove(token);
    }

    /// Delay every answer, to exercise liveness timeouts
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).delay = Some(delay);
    }

    /// Fail every query
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).unavailable = unavailable;
    }

    /// Tokens queried so far, in order
    pub fn queries(&self) -> Vec<LockToken> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .queries
            .clone()
    }

    /// Tokens currently registered and not withdrawn, in order
    pub fn registered(&self) -> Vec<LockToken> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .registered
            .clone()
    }
}

#[async_trait]
impl JobRuntime for FakeJobRuntime {
    async fn is_alive(&self, token: &LockToken) -> Result<bool, RuntimeError> {
        let delay = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.queries.push(token.clone());
            inner.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.unavailable {
            return Err(RuntimeError::Unavailable("injected failure".to_string()));
        }
        Ok(inner.live.contains(token))
    }

    async fn register(&self, token: &LockToken) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.live.insert(token.clone());
        inner.registered.push(token.clone());
        Ok(())
    }

    async fn deregister(&self, token: &LockToken) -> Result<(), RuntimeError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.live.remove(token);
        inner.registered.retain(|t| t != token);
        Ok(())
    }
}
