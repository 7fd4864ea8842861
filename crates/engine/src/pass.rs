// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One end-to-end scheduling pass
//!
//! scan → lock check (with orphan recovery) → classify → register → acquire
//! → record start → enqueue → clear flag. Each due course is handled
//! independently; a failure on one course is reported and the pass continues. Every pass
//! builds its own [`PassReport`], flushed to the diagnostic sink at the end
//! (also when the pass aborts).

use crate::config::PassConfig;
use crate::error::{PassError, SchedulerError};
use crate::exclusivity::ExclusivityLock;
use cu_adapters::{DiagnosticSink, JobQueue, JobRuntime, LockError, LockStore, UpdateJob};
use cu_core::{
    classify, due_courses, eligibility, AttemptOutcome, Clock, Course, CourseId, Event, LockRecord,
    LockToken, PassReport, QueueTier, TokenGen,
};
use cu_storage::CourseStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::Instrument;

/// Adapter dependencies of a scheduling pass
pub struct PassDeps<S, L, R, Q, D> {
    pub store: S,
    pub locks: L,
    pub runtime: R,
    pub queue: Q,
    pub sink: D,
}

/// What happened to one due course
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum CourseOutcome {
    Enqueued(QueueTier),
    /// A live job holds the lock
    InFlight,
    /// Another scheduler got there first
    Contended,
}

/// Runs scheduling passes over a course store
pub struct SchedulingPass<S, L, R, Q, D, C: Clock, T: TokenGen> {
    store: S,
    lock: ExclusivityLock<L, R>,
    queue: Q,
    sink: D,
    clock: C,
    tokens: T,
    config: PassConfig,
    passes: AtomicU64,
}

impl<S, L, R, Q, D, C, T> SchedulingPass<S, L, R, Q, D, C, T>
where
    S: CourseStore,
    L: LockStore,
    R: JobRuntime,
    Q: JobQueue,
    D: DiagnosticSink,
    C: Clock,
    T: TokenGen,
{
    pub fn new(deps: PassDeps<S, L, R, Q, D>, clock: C, tokens: T, config: PassConfig) -> Self {
        Self {
            store: deps.store,
            lock: ExclusivityLock::new(deps.locks, deps.runtime, config.liveness_timeout),
            queue: deps.queue,
            sink: deps.sink,
            clock,
            tokens,
            config,
            passes: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &PassConfig {
        &self.config
    }

    pub fn lock(&self) -> &ExclusivityLock<L, R> {
        &self.lock
    }

    /// Run one pass and return its report
    ///
    /// Per-course failures are recorded in the report. Only a failed course
    /// scan or a failed diagnostic flush makes the pass itself fail.
    pub async fn run(&self) -> Result<PassReport, PassError> {
        let seq = self.passes.fetch_add(1, Ordering::SeqCst) + 1;
        let report = PassReport::new(format!("pass-{seq}"), self.clock.utc_now());
        let span = tracing::info_span!("pass", pass_id = %report.pass_id);
        self.run_inner(report).instrument(span).await
    }

    async fn run_inner(&self, mut report: PassReport) -> Result<PassReport, PassError> {
        let started = self.clock.now();
        let now = report.started_at;

        let courses = match self.store.list() {
            Ok(courses) => courses,
            Err(source) => {
                tracing::error!(error = %source, "course scan failed");
                report.push(Event::PassAborted {
                    error: source.to_string(),
                });
                report.elapsed = self.clock.now().saturating_duration_since(started);
                // Best effort: the scan error takes precedence over a flush error
                if let Err(e) = self.sink.flush(&report).await {
                    tracing::error!(error = %e, "failed to flush diagnostics of aborted pass");
                }
                return Err(PassError::Scan {
                    source,
                    report: Box::new(report),
                });
            }
        };

        let due = due_courses(courses.iter(), now);
        let by_id: HashMap<CourseId, &Course> = courses.iter().map(|c| (c.id, c)).collect();
        report.summary.due = due.len();
        tracing::debug!(total = courses.len(), due = due.len(), "scanned courses");

        for course_id in due {
            let Some(course) = by_id.get(&course_id) else {
                continue;
            };
            tracing::trace!(course_id = %course_id, reason = ?eligibility(course, now), "due");

            match self.schedule_course(course, &mut report).await {
                Ok(CourseOutcome::Enqueued(tier)) => report.summary.record_enqueue(tier),
                Ok(CourseOutcome::InFlight) => report.summary.in_flight += 1,
                Ok(CourseOutcome::Contended) => report.summary.contended += 1,
                Err(e) => {
                    tracing::error!(course_id = %course_id, error = %e, "course update failed");
                    report.summary.failed += 1;
                    report.push(Event::CourseUpdateFailed {
                        course_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        let elapsed = self.clock.now().saturating_duration_since(started);
        report.elapsed = elapsed;
        report.push(report.summary.to_event());

        let threshold = self.config.latency_threshold(report.summary.due);
        if elapsed > threshold {
            tracing::warn!(
                elapsed_ms = elapsed.as_millis() as u64,
                threshold_ms = threshold.as_millis() as u64,
                "scheduling pass ran slow"
            );
            report.push(Event::ShortUpdateLatencyWarning {
                elapsed_ms: elapsed.as_millis() as u64,
                course_count: report.summary.due,
            });
        }

        tracing::info!("{}", report.summary_line());

        match self.sink.flush(&report).await {
            Ok(()) => Ok(report),
            Err(source) => {
                tracing::error!(error = %source, "diagnostic flush failed");
                Err(PassError::Flush {
                    source,
                    report: Box::new(report),
                })
            }
        }
    }

    async fn schedule_course(
        &self,
        course: &Course,
        report: &mut PassReport,
    ) -> Result<CourseOutcome, SchedulerError> {
        let course_id = course.id;
        let recovered = match self.lock.holder(course_id).await {
            Ok(Some(holder)) => {
                if let Some(skipped) = self.recover_orphan(&holder, report).await? {
                    return Ok(skipped);
                }
                true
            }
            Ok(None) => false,
            Err(LockError::Corrupt { reason, .. }) => {
                if !self.lock.clear_corrupt(course_id).await? {
                    return Ok(CourseOutcome::Contended);
                }
                tracing::warn!(course_id = %course_id, reason = %reason, "cleared corrupt lock record");
                report.push(Event::CorruptLockCleared { course_id, reason });
                true
            }
            Err(e) => return Err(e.into()),
        };

        // A course that just lost its job goes to the fastest queue so the
        // failure resurfaces promptly
        let tier = if recovered {
            QueueTier::Short
        } else {
            let estimate = self.store.duration_estimate(course_id, self.config.window)?;
            classify(estimate, &self.config.thresholds)
        };

        // Registered before the lock exists so no pass ever sees the new
        // holder without a live job behind it
        let token = self.tokens.next();
        self.lock.register(&token).await?;
        if !self.lock.try_acquire(course_id, &token).await? {
            self.deregister_quietly(&token).await;
            tracing::debug!(course_id = %course_id, "lock contended, skipping");
            return Ok(CourseOutcome::Contended);
        }

        let dispatched = self
            .store
            .record_dispatch(course_id, &token, self.clock.utc_now());
        let attempt_id = match dispatched {
            Ok(attempt_id) => attempt_id,
            Err(e) => {
                self.release_quietly(course_id, &token).await;
                return Err(e.into());
            }
        };

        let job = UpdateJob {
            course_id,
            token,
            attempt_id,
        };
        if let Err(e) = self.queue.enqueue(tier.queue_name(), &job).await {
            self.abandon(&job).await;
            return Err(e.into());
        }

        if course.needs_update {
            if let Err(e) = self.store.clear_needs_update(course_id) {
                tracing::warn!(course_id = %course_id, error = %e, "failed to clear needs_update");
            }
        }

        tracing::info!(course_id = %course_id, tier = %tier, attempt_id = %attempt_id, "course enqueued");
        report.push(Event::CourseEnqueued {
            course_id,
            tier,
            attempt_id,
        });
        Ok(CourseOutcome::Enqueued(tier))
    }

    /// Clear `holder`'s lock if its job is dead
    ///
    /// The dead job's attempt is flagged while its lock is still in place,
    /// so no newer job can exist for the course yet. Marking is idempotent
    /// per holder token: a pass that loses the release race repeats it
    /// harmlessly. Returns the outcome of a course that must be skipped, or
    /// None once the lock is cleared.
    async fn recover_orphan(
        &self,
        holder: &LockRecord,
        report: &mut PassReport,
    ) -> Result<Option<CourseOutcome>, SchedulerError> {
        let course_id = holder.course_id;
        if !self.lock.is_dead(holder).await {
            tracing::debug!(course_id = %course_id, token = %holder.token, "update in flight, skipping");
            return Ok(Some(CourseOutcome::InFlight));
        }

        let attempt_id = self
            .store
            .mark_orphan_failure(course_id, &holder.token, self.clock.utc_now())?;
        if !self.lock.clear_orphan(holder).await? {
            tracing::debug!(course_id = %course_id, "orphan already recovered, skipping");
            return Ok(Some(CourseOutcome::Contended));
        }

        tracing::warn!(
            course_id = %course_id,
            previous_token = %holder.token,
            attempt_id = %attempt_id,
            "cleared orphaned lock"
        );
        report.summary.orphans += 1;
        report.push(Event::OrphanLockCleared {
            course_id,
            previous_token: holder.token.clone(),
            attempt_id,
        });
        Ok(None)
    }

    /// Undo a job that never reached its queue
    async fn abandon(&self, job: &UpdateJob) {
        if let Err(e) = self.store.record_end(
            job.course_id,
            job.attempt_id,
            AttemptOutcome::Failed,
            self.clock.utc_now(),
        ) {
            tracing::warn!(course_id = %job.course_id, error = %e, "failed to close abandoned attempt");
        }
        self.release_quietly(job.course_id, &job.token).await;
    }

    /// Release a lock whose job will never run
    async fn release_quietly(&self, course_id: CourseId, token: &LockToken) {
        if let Err(e) = self.lock.release(course_id, token).await {
            tracing::warn!(course_id = %course_id, error = %e, "failed to release lock");
        }
        self.deregister_quietly(token).await;
    }

    async fn deregister_quietly(&self, token: &LockToken) {
        if let Err(e) = self.lock.deregister(token).await {
            tracing::warn!(token = %token, error = %e, "failed to withdraw job registration");
        }
    }
}

#[cfg(test)]
#[path = "pass_tests.rs"]
mod tests;
