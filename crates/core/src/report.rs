// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-pass diagnostic report
//!
//! Each scheduling pass accumulates its own report and hands it back to the
//! caller, so concurrent passes never share diagnostic state.

use crate::event::Event;
use crate::tier::QueueTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Counters for one pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassSummary {
    pub short: usize,
    pub medium: usize,
    pub long: usize,
    /// Orphaned locks cleared
    pub orphans: usize,
    /// Courses found due by the scan
    pub due: usize,
    /// Skipped because a live job already holds the lock
    pub in_flight: usize,
    /// Lost the acquire race to another scheduler
    pub contended: usize,
    /// Per-course failures
    pub failed: usize,
}

impl PassSummary {
    pub fn record_enqueue(&mut self, tier: QueueTier) {
        match tier {
            QueueTier::Short => self.short += 1,
            QueueTier::Medium => self.medium += 1,
            QueueTier::Long => self.long += 1,
        }
    }

    pub fn count(&self, tier: QueueTier) -> usize {
        match tier {
            QueueTier::Short => self.short,
            QueueTier::Medium => self.medium,
            QueueTier::Long => self.long,
        }
    }

    pub fn enqueued(&self) -> usize {
        self.short + self.medium + self.long
    }

    pub fn to_event(&self) -> Event {
        Event::PassSummary {
            short_count: self.short,
            medium_count: self.medium,
            long_count: self.long,
            orphan_count: self.orphans,
            due_count: self.due,
            in_flight_count: self.in_flight,
            contended_count: self.contended,
            failed_count: self.failed,
        }
    }
}

/// Everything a pass observed, in emission order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub pass_id: String,
    pub started_at: DateTime<Utc>,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub summary: PassSummary,
    pub events: Vec<Event>,
}

impl PassReport {
    pub fn new(pass_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            pass_id: pass_id.into(),
            started_at,
            elapsed: Duration::ZERO,
            summary: PassSummary::default(),
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Events with the given name
    pub fn events_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.name() == name)
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.name() == name)
    }

    /// One-line human summary
    pub fn summary_line(&self) -> String {
        let s = &self.summary;
        format!(
            "pass {}: due={} short={} medium={} long={} orphans={} in_flight={} contended={} failed={} elapsed={}ms",
            self.pass_id,
            s.due,
            s.short,
            s.medium,
            s.long,
            s.orphans,
            s.in_flight,
            s.contended,
            s.failed,
            self.elapsed.as_millis()
        )
    }
}
