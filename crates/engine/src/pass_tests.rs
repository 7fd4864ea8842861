// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use cu_adapters::{
    FakeDiagnosticSink, FakeJobQueue, FakeJobRuntime, MemoryLockStore, QueueError,
};
use cu_core::{
    ActiveWindow, AttemptId, FakeClock, LockRecord, SequentialTokenGen, UpdateHistory,
};
use cu_storage::{MemoryCourseStore, StoreError};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

type TestPass<Q = FakeJobQueue, S = MemoryCourseStore> = SchedulingPass<
    S,
    MemoryLockStore<FakeClock>,
    FakeJobRuntime,
    Q,
    FakeDiagnosticSink,
    FakeClock,
    SequentialTokenGen,
>;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
}

fn days(n: i64) -> chrono::Duration {
    chrono::Duration::days(n)
}

fn active(id: u64) -> Course {
    Course::new(
        CourseId(id),
        format!("Org/Active_{id}"),
        ActiveWindow::new(now() - days(1), now() + days(30)),
    )
}

fn inactive(id: u64) -> Course {
    Course::new(
        CourseId(id),
        format!("Org/Finished_{id}"),
        ActiveWindow::new(now() - days(60), now() - days(30)),
    )
}

/// History of `n` successful attempts of `secs` seconds each
fn history_of(n: usize, secs: i64) -> UpdateHistory {
    let mut history = UpdateHistory::new();
    for i in 0..n {
        let start = now() - days(2) + chrono::Duration::hours(i as i64);
        let id = history.record_start(start);
        history
            .record_end(
                id,
                AttemptOutcome::Succeeded,
                start + chrono::Duration::seconds(secs),
            )
            .unwrap();
    }
    history
}

struct Harness<Q = FakeJobQueue> {
    store: MemoryCourseStore,
    locks: MemoryLockStore<FakeClock>,
    runtime: FakeJobRuntime,
    queue: Q,
    sink: FakeDiagnosticSink,
    clock: FakeClock,
    pass: TestPass<Q>,
}

fn harness(courses: impl IntoIterator<Item = Course>) -> Harness {
    harness_with_queue(courses, FakeJobQueue::new(), FakeClock::at(now()))
}

fn harness_with_queue<Q: JobQueue>(
    courses: impl IntoIterator<Item = Course>,
    queue: Q,
    clock: FakeClock,
) -> Harness<Q> {
    let store = MemoryCourseStore::with_courses(courses);
    let locks = MemoryLockStore::with_clock(clock.clone());
    let runtime = FakeJobRuntime::new();
    let sink = FakeDiagnosticSink::new();
    let pass = SchedulingPass::new(
        PassDeps {
            store: store.clone(),
            locks: locks.clone(),
            runtime: runtime.clone(),
            queue: queue.clone(),
            sink: sink.clone(),
        },
        clock.clone(),
        SequentialTokenGen::new("tok"),
        PassConfig::default(),
    );
    Harness {
        store,
        locks,
        runtime,
        queue,
        sink,
        clock,
        pass,
    }
}

impl<Q> Harness<Q> {
    fn history(&self, id: u64) -> UpdateHistory {
        self.store.get(CourseId(id)).unwrap().history
    }

    async fn holder(&self, id: u64) -> Option<LockToken> {
        self.locks
            .current(CourseId(id))
            .await
            .unwrap()
            .map(|r| r.token)
    }

    fn seed_lock(&self, id: u64, token: &str) {
        self.locks.insert(LockRecord {
            course_id: CourseId(id),
            token: LockToken::new(token),
            acquired_at: now() - chrono::Duration::hours(3),
        });
    }
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn course_without_history_goes_to_short_queue() {
    let h = harness([active(1)]);

    let report = h.pass.run().await.unwrap();

    let jobs = h.queue.jobs_in("short_update");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].course_id, CourseId(1));
    assert_eq!(jobs[0].token, LockToken::new("tok-1"));
    assert_eq!(report.summary.short, 1);
    assert!(report.has_event("course_enqueued"));

    let history = h.history(1);
    assert_eq!(history.attempts().len(), 1);
    assert!(history.open_attempt().is_some());
    assert_eq!(jobs[0].attempt_id, history.latest().unwrap().id);
    assert_eq!(h.holder(1).await, Some(LockToken::new("tok-1")));
}

#[tokio::test]
async fn ninety_second_average_goes_to_medium_queue() {
    let h = harness([active(1).with_history(history_of(3, 90))]);

    let report = h.pass.run().await.unwrap();

    assert_eq!(h.queue.jobs_in("medium_update").len(), 1);
    assert!(h.queue.jobs_in("short_update").is_empty());
    assert_eq!(report.summary.medium, 1);
}

#[tokio::test]
async fn long_average_goes_to_long_queue() {
    let h = harness([active(1).with_history(history_of(3, 1200))]);

    h.pass.run().await.unwrap();

    assert_eq!(h.queue.jobs_in("long_update").len(), 1);
}

#[tokio::test]
async fn dead_owner_lock_is_cleared_and_course_requeued_short() {
    let mut history = history_of(3, 1200);
    let stale_attempt =
        history.record_dispatch(&LockToken::new("dead-1"), now() - chrono::Duration::hours(3));
    let h = harness([active(1).with_history(history)]);
    h.seed_lock(1, "dead-1");

    let report = h.pass.run().await.unwrap();

    assert_eq!(report.summary.orphans, 1);
    let cleared: Vec<_> = report.events_named("orphan_lock_cleared").collect();
    assert_eq!(
        cleared,
        vec![&Event::OrphanLockCleared {
            course_id: CourseId(1),
            previous_token: LockToken::new("dead-1"),
            attempt_id: stale_attempt,
        }]
    );

    let history = h.history(1);
    let stale = history.get(stale_attempt).unwrap();
    assert!(stale.orphan_lock_failure);
    assert!(!stale.is_open());

    let jobs = h.queue.jobs_for(CourseId(1));
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].queue, "short_update");
    assert_eq!(history.open_attempt().map(|a| a.id), Some(jobs[0].job.attempt_id));
    assert_eq!(h.holder(1).await, Some(jobs[0].job.token.clone()));
}

#[tokio::test]
async fn orphan_without_attempt_is_recorded_and_goes_short() {
    let h = harness([active(1).with_history(history_of(3, 1200))]);
    h.seed_lock(1, "dead-before-start");

    let report = h.pass.run().await.unwrap();

    let history = h.history(1);
    assert_eq!(history.attempts().len(), 5);
    let flagged = history
        .attempts()
        .iter()
        .find(|a| a.orphan_lock_failure)
        .unwrap();
    assert_eq!(flagged.token, Some(LockToken::new("dead-before-start")));
    assert_eq!(flagged.outcome, Some(AttemptOutcome::Failed));
    assert!(!flagged.is_open());
    assert!(matches!(
        &report.events_named("orphan_lock_cleared").collect::<Vec<_>>()[..],
        [Event::OrphanLockCleared { attempt_id, .. }] if *attempt_id == flagged.id
    ));
    assert_eq!(h.queue.jobs_in("short_update").len(), 1);
    assert!(h.queue.jobs_in("long_update").is_empty());
}

#[tokio::test]
async fn inactive_unflagged_course_is_untouched() {
    let before = inactive(1).with_history(history_of(2, 30));
    let h = harness([before.clone()]);

    let report = h.pass.run().await.unwrap();

    assert!(h.queue.calls().is_empty());
    assert_eq!(h.store.get(CourseId(1)).unwrap(), before);
    assert_eq!(h.holder(1).await, None);
    assert_eq!(report.summary.due, 0);
}

// =============================================================================
// Locks and flags
// =============================================================================

#[tokio::test]
async fn healthy_held_lock_is_skipped_without_side_effects() {
    let mut history = history_of(1, 30);
    history.record_start(now() - chrono::Duration::minutes(1));
    let before = active(1).with_history(history).with_needs_update(true);
    let h = harness([before.clone()]);
    h.seed_lock(1, "live-1");
    h.runtime.set_alive(&LockToken::new("live-1"));

    let report = h.pass.run().await.unwrap();

    assert!(h.queue.calls().is_empty());
    assert_eq!(h.store.get(CourseId(1)).unwrap(), before);
    assert_eq!(h.holder(1).await, Some(LockToken::new("live-1")));
    assert_eq!(report.summary.in_flight, 1);
    assert_eq!(report.summary.orphans, 0);
}

#[tokio::test(start_paused = true)]
async fn slow_liveness_answer_is_treated_as_alive() {
    let h = harness([active(1)]);
    h.seed_lock(1, "unknown");
    h.runtime.set_delay(Duration::from_secs(30));

    let report = h.pass.run().await.unwrap();

    assert_eq!(report.summary.in_flight, 1);
    assert_eq!(report.summary.orphans, 0);
    assert_eq!(h.holder(1).await, Some(LockToken::new("unknown")));
}

#[tokio::test]
async fn queued_job_is_not_redispatched_before_its_worker_starts() {
    let h = harness([active(1)]);

    h.pass.run().await.unwrap();
    let report = h.pass.run().await.unwrap();

    assert_eq!(report.summary.in_flight, 1);
    assert_eq!(report.summary.orphans, 0);
    assert_eq!(h.queue.jobs_for(CourseId(1)).len(), 1);
    assert_eq!(h.runtime.registered(), vec![LockToken::new("tok-1")]);
    assert_eq!(h.history(1).attempts().len(), 1);
}

#[tokio::test]
async fn flagged_inactive_course_is_enqueued_and_flag_cleared() {
    let h = harness([inactive(1).with_needs_update(true)]);

    h.pass.run().await.unwrap();

    assert_eq!(h.queue.jobs_for(CourseId(1)).len(), 1);
    assert!(!h.store.get(CourseId(1)).unwrap().needs_update);
}

#[tokio::test]
async fn enqueue_failure_keeps_flag_releases_lock_and_continues() {
    let h = harness([
        active(1).with_needs_update(true),
        active(2).with_needs_update(true),
    ]);
    h.queue.fail_course(CourseId(1));

    let report = h.pass.run().await.unwrap();

    assert_eq!(report.summary.failed, 1);
    assert!(matches!(
        &report.events_named("course_update_failed").collect::<Vec<_>>()[..],
        [Event::CourseUpdateFailed { course_id: CourseId(1), .. }]
    ));

    let failed = h.store.get(CourseId(1)).unwrap();
    assert!(failed.needs_update);
    assert_eq!(h.holder(1).await, None);
    let attempt = failed.history.latest().unwrap();
    assert_eq!(attempt.outcome, Some(AttemptOutcome::Failed));
    assert!(!attempt.is_open());

    assert_eq!(h.queue.jobs_for(CourseId(2)).len(), 1);
    assert!(!h.store.get(CourseId(2)).unwrap().needs_update);
    // Only the job that reached its queue stays registered
    let holder = h.holder(2).await.unwrap();
    assert_eq!(h.runtime.registered(), vec![holder]);
}

#[tokio::test]
async fn summary_counts_match_enqueues_and_cleared_orphans() {
    let h = harness([
        active(1),
        active(2).with_history(history_of(3, 90)),
        active(3).with_history(history_of(3, 1200)),
        active(4).with_history(history_of(3, 1200)),
        active(5),
        inactive(6),
    ]);
    h.seed_lock(4, "dead-4");
    h.seed_lock(5, "live-5");
    h.runtime.set_alive(&LockToken::new("live-5"));

    let report = h.pass.run().await.unwrap();
    let s = report.summary;

    for tier in QueueTier::ALL {
        assert_eq!(s.count(tier), h.queue.jobs_in(tier.queue_name()).len());
    }
    assert_eq!(s.orphans, report.events_named("orphan_lock_cleared").count());
    assert_eq!((s.short, s.medium, s.long), (2, 1, 1));
    assert_eq!((s.due, s.in_flight, s.contended, s.failed), (5, 1, 0, 0));
    assert!(matches!(
        report.events.last(),
        Some(Event::PassSummary {
            short_count: 2,
            medium_count: 1,
            long_count: 1,
            orphan_count: 1,
            ..
        })
    ));
}

// =============================================================================
// Diagnostics and failures
// =============================================================================

#[tokio::test]
async fn report_is_flushed_to_sink() {
    let h = harness([active(1)]);

    let report = h.pass.run().await.unwrap();

    assert_eq!(h.sink.reports(), vec![report]);
}

#[tokio::test]
async fn pass_ids_are_sequential() {
    let h = harness([active(1)]);

    let first = h.pass.run().await.unwrap();
    let second = h.pass.run().await.unwrap();

    assert_eq!(first.pass_id, "pass-1");
    assert_eq!(second.pass_id, "pass-2");
    assert_eq!(second.summary.in_flight, 1);
}

#[derive(Clone)]
struct BrokenStore;

impl CourseStore for BrokenStore {
    fn list(&self) -> Result<Vec<Course>, StoreError> {
        Err(StoreError::Unavailable("disk on fire".to_string()))
    }

    fn get(&self, id: CourseId) -> Result<Course, StoreError> {
        Err(StoreError::NotFound(id))
    }

    fn put(&self, _course: &Course) -> Result<(), StoreError> {
        Ok(())
    }

    fn update<R, F>(&self, id: CourseId, _f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Course) -> R,
    {
        Err(StoreError::NotFound(id))
    }
}

#[tokio::test]
async fn scan_failure_flushes_diagnostics_then_fails() {
    let clock = FakeClock::at(now());
    let sink = FakeDiagnosticSink::new();
    let pass: TestPass<FakeJobQueue, BrokenStore> = SchedulingPass::new(
        PassDeps {
            store: BrokenStore,
            locks: MemoryLockStore::with_clock(clock.clone()),
            runtime: FakeJobRuntime::new(),
            queue: FakeJobQueue::new(),
            sink: sink.clone(),
        },
        clock,
        SequentialTokenGen::new("tok"),
        PassConfig::default(),
    );

    let err = pass.run().await.unwrap_err();

    assert!(matches!(err, PassError::Scan { .. }));
    assert!(err.report().has_event("pass_aborted"));
    let flushed = sink.last().unwrap();
    assert!(flushed.has_event("pass_aborted"));
}

#[tokio::test]
async fn sink_failure_fails_pass_with_gathered_report() {
    let h = harness([active(1)]);
    h.sink.set_failing(true);

    let err = h.pass.run().await.unwrap_err();

    assert!(matches!(err, PassError::Flush { .. }));
    assert_eq!(err.report().summary.short, 1);
    assert_eq!(h.queue.calls().len(), 1);
}

/// Queue that makes every enqueue take a while
#[derive(Clone)]
struct SlowQueue {
    inner: FakeJobQueue,
    clock: FakeClock,
    cost: Duration,
}

#[async_trait]
impl JobQueue for SlowQueue {
    async fn enqueue(&self, queue: &str, job: &UpdateJob) -> Result<(), QueueError> {
        self.clock.advance(self.cost);
        self.inner.enqueue(queue, job).await
    }
}

#[tokio::test]
async fn slow_pass_emits_latency_warning() {
    let clock = FakeClock::at(now());
    let queue = SlowQueue {
        inner: FakeJobQueue::new(),
        clock: clock.clone(),
        cost: Duration::from_secs(20),
    };
    let h = harness_with_queue([active(1), active(2)], queue, clock);

    let report = h.pass.run().await.unwrap();

    assert_eq!(report.elapsed, Duration::from_secs(40));
    assert!(matches!(
        &report.events_named("short_update_latency_warning").collect::<Vec<_>>()[..],
        [Event::ShortUpdateLatencyWarning { elapsed_ms: 40_000, course_count: 2 }]
    ));
}

#[tokio::test]
async fn fast_pass_emits_no_latency_warning() {
    let h = harness([active(1), active(2)]);

    let report = h.pass.run().await.unwrap();

    assert!(!report.has_event("short_update_latency_warning"));
}

// =============================================================================
// Concurrency
// =============================================================================

/// A second scheduler sharing every adapter of `h` except the sink
fn rival_of(h: &Harness) -> (TestPass, FakeDiagnosticSink) {
    let sink = FakeDiagnosticSink::new();
    let rival = SchedulingPass::new(
        PassDeps {
            store: h.store.clone(),
            locks: h.locks.clone(),
            runtime: h.runtime.clone(),
            queue: h.queue.clone(),
            sink: sink.clone(),
        },
        h.clock.clone(),
        SequentialTokenGen::new("rival"),
        PassConfig::default(),
    );
    (rival, sink)
}

fn racing_passes(
    courses: impl IntoIterator<Item = Course>,
) -> (Harness, TestPass, FakeDiagnosticSink) {
    let h = harness(courses);
    let (rival, sink) = rival_of(&h);
    // Jobs dispatched by either pass are running
    for i in 1..=20 {
        h.runtime.set_alive(&LockToken::new(format!("tok-{i}")));
        h.runtime.set_alive(&LockToken::new(format!("rival-{i}")));
    }
    (h, rival, sink)
}

#[tokio::test]
async fn overlapping_passes_enqueue_each_course_once() {
    let (h, rival, _) = racing_passes((1..=5).map(active));

    let (a, b) = tokio::join!(h.pass.run(), rival.run());
    let (a, b) = (a.unwrap(), b.unwrap());

    for id in 1..=5 {
        assert_eq!(h.queue.jobs_for(CourseId(id)).len(), 1, "course {id}");
        assert_eq!(h.history(id).attempts().len(), 1, "course {id}");
    }
    assert_eq!(a.summary.enqueued() + b.summary.enqueued(), 5);
    assert_eq!(
        a.summary.in_flight + a.summary.contended + b.summary.in_flight + b.summary.contended,
        5
    );
    // Losers of the acquire race withdrew their registrations
    assert_eq!(h.runtime.registered().len(), 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_passes_have_one_winner_per_course() {
    let (h, rival, _) = racing_passes((1..=10).map(|id| active(id).with_needs_update(true)));
    let h = Arc::new(h);
    let rival = Arc::new(rival);

    let first = {
        let h = Arc::clone(&h);
        tokio::spawn(async move { h.pass.run().await.map(|r| r.summary) })
    };
    let second = tokio::spawn(async move { rival.run().await.map(|r| r.summary) });
    let a = first.await.unwrap().unwrap();
    let b = second.await.unwrap().unwrap();

    assert_eq!(a.enqueued() + b.enqueued(), 10);
    for id in 1..=10 {
        let jobs = h.queue.jobs_for(CourseId(id));
        assert_eq!(jobs.len(), 1, "course {id}");
        assert_eq!(h.history(id).attempts().len(), 1, "course {id}");
        assert_eq!(h.holder(id).await, Some(jobs[0].job.token.clone()));
        assert!(!h.store.get(CourseId(id)).unwrap().needs_update);
    }
}

/// Adapter that runs a whole rival pass once, right after it handles
/// `trigger`
#[derive(Clone)]
struct Interleave<T> {
    inner: T,
    trigger: LockToken,
    rival: Arc<TestPass>,
    fired: Arc<AtomicBool>,
}

impl<T> Interleave<T> {
    fn new(inner: T, trigger: &str, rival: TestPass) -> Self {
        Self {
            inner,
            trigger: LockToken::new(trigger),
            rival: Arc::new(rival),
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    async fn fire(&self, token: &LockToken) {
        if *token == self.trigger && !self.fired.swap(true, Ordering::SeqCst) {
            self.rival.run().await.unwrap();
        }
    }
}

#[async_trait]
impl LockStore for Interleave<MemoryLockStore<FakeClock>> {
    async fn try_acquire(&self, course_id: CourseId, token: &LockToken) -> Result<bool, LockError> {
        self.inner.try_acquire(course_id, token).await
    }

    async fn current(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError> {
        self.inner.current(course_id).await
    }

    async fn release(&self, course_id: CourseId, token: &LockToken) -> Result<bool, LockError> {
        let released = self.inner.release(course_id, token).await?;
        self.fire(token).await;
        Ok(released)
    }

    async fn force_release(&self, course_id: CourseId) -> Result<Option<LockRecord>, LockError> {
        self.inner.force_release(course_id).await
    }

    async fn clear_corrupt(&self, course_id: CourseId) -> Result<bool, LockError> {
        self.inner.clear_corrupt(course_id).await
    }
}

#[async_trait]
impl JobRuntime for Interleave<FakeJobRuntime> {
    async fn is_alive(&self, token: &LockToken) -> Result<bool, cu_adapters::RuntimeError> {
        let alive = self.inner.is_alive(token).await?;
        self.fire(token).await;
        Ok(alive)
    }

    async fn register(&self, token: &LockToken) -> Result<(), cu_adapters::RuntimeError> {
        self.inner.register(token).await
    }

    async fn deregister(&self, token: &LockToken) -> Result<(), cu_adapters::RuntimeError> {
        self.inner.deregister(token).await
    }
}

fn pass_over<L: LockStore, R: JobRuntime>(
    h: &Harness,
    locks: L,
    runtime: R,
) -> SchedulingPass<
    MemoryCourseStore,
    L,
    R,
    FakeJobQueue,
    FakeDiagnosticSink,
    FakeClock,
    SequentialTokenGen,
> {
    SchedulingPass::new(
        PassDeps {
            store: h.store.clone(),
            locks,
            runtime,
            queue: h.queue.clone(),
            sink: h.sink.clone(),
        },
        h.clock.clone(),
        SequentialTokenGen::new("tok"),
        PassConfig::default(),
    )
}

/// Course 1 locked by a dead job with its attempt still open
fn orphaned_course() -> (Harness, AttemptId) {
    let mut history = history_of(3, 1200);
    let stale =
        history.record_dispatch(&LockToken::new("dead-1"), now() - chrono::Duration::hours(3));
    let h = harness([active(1).with_history(history)]);
    h.seed_lock(1, "dead-1");
    (h, stale)
}

/// The dead job's attempt is closed as an orphan and the winner's stays open
async fn assert_single_recovery(h: &Harness, stale: AttemptId, orphans: usize) {
    assert_eq!(orphans, 1);

    let history = h.history(1);
    let stale = history.get(stale).unwrap();
    assert!(stale.orphan_lock_failure);
    assert!(!stale.is_open());
    assert_eq!(stale.outcome, Some(AttemptOutcome::Failed));

    let open = history.open_attempt().unwrap();
    assert_eq!(open.token, Some(LockToken::new("rival-1")));
    assert!(!open.orphan_lock_failure);
    assert_eq!(history.attempts().len(), 5);

    let jobs = h.queue.jobs_for(CourseId(1));
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].queue, "short_update");
    assert_eq!(jobs[0].job.attempt_id, open.id);
    assert_eq!(h.holder(1).await, Some(LockToken::new("rival-1")));
}

#[tokio::test]
async fn rival_dispatching_right_after_orphan_release_keeps_its_attempt() {
    let (h, stale) = orphaned_course();
    let (rival, rival_sink) = rival_of(&h);
    let locks = Interleave::new(h.locks.clone(), "dead-1", rival);
    let pass = pass_over(&h, locks, h.runtime.clone());

    let report = pass.run().await.unwrap();

    let rival_report = rival_sink.last().unwrap();
    assert_eq!(rival_report.summary.short, 1);
    assert_eq!(report.summary.contended, 1);
    assert_single_recovery(&h, stale, report.summary.orphans + rival_report.summary.orphans)
        .await;
}

#[tokio::test]
async fn rival_recovering_the_same_orphan_first_is_not_double_counted() {
    let (h, stale) = orphaned_course();
    let (rival, rival_sink) = rival_of(&h);
    let runtime = Interleave::new(h.runtime.clone(), "dead-1", rival);
    let pass = pass_over(&h, h.locks.clone(), runtime);

    let report = pass.run().await.unwrap();

    let rival_report = rival_sink.last().unwrap();
    assert_eq!(rival_report.summary.orphans, 1);
    assert_eq!(report.summary.orphans, 0);
    assert_eq!(report.summary.contended, 1);
    assert!(!report.has_event("orphan_lock_cleared"));
    assert_single_recovery(&h, stale, report.summary.orphans + rival_report.summary.orphans)
        .await;
}
