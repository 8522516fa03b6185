//! Scheduler implementation

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::config::SchedulerConfig;
use super::cycle::{CycleReport, SchedulerState, SchedulerStats};
use super::error::SchedulerError;
use super::executor;
use super::handle::SchedulerHandle;
use super::registry::TaskRegistry;
use super::report::{FailureReporter, TaskFailure, TracingReporter};
use crate::domain::{Task, TaskInfo};

/// The Scheduler repeatedly runs due tasks in priority order.
///
/// Each cycle snapshots the registry, reads the clock once, orders the due
/// tasks and awaits them one at a time, then sleeps for the poll interval.
/// Tasks can be added and removed from any thread while it runs.
pub struct Scheduler {
    config: SchedulerConfig,
    registry: TaskRegistry,
    clock: Arc<dyn Clock>,
    reporter: Arc<dyn FailureReporter>,
    state: AtomicU8,
    stats: Mutex<SchedulerStats>,
}

/// Restores a lifecycle state when a run ends, including by panic or drop
struct StateGuard<'a> {
    state: &'a AtomicU8,
    on_exit: SchedulerState,
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        self.state.store(self.on_exit.as_u8(), Ordering::Release);
    }
}

impl Scheduler {
    /// Create a scheduler using the system clock and tracing reporter
    pub fn new(config: SchedulerConfig) -> Self {
        debug!(?config, "Scheduler::new: called");
        Self {
            config,
            registry: TaskRegistry::new(),
            clock: Arc::new(SystemClock),
            reporter: Arc::new(TracingReporter),
            state: AtomicU8::new(SchedulerState::Idle.as_u8()),
            stats: Mutex::new(SchedulerStats::default()),
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different failure reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Register a task; it is considered from the next cycle on
    pub fn add(&self, task: Task) -> Uuid {
        self.registry.add(task)
    }

    /// Remove every task with this name; returns how many were removed
    pub fn remove(&self, name: &str) -> usize {
        self.registry.remove(name)
    }

    /// Read-only view of the registered tasks, in insertion order
    pub fn list_tasks(&self) -> Vec<TaskInfo> {
        self.registry.list()
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn enter_running(&self) -> Result<(), SchedulerError> {
        self.state
            .compare_exchange(
                SchedulerState::Idle.as_u8(),
                SchedulerState::Running.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|current| SchedulerError::AlreadyStarted {
                state: SchedulerState::from_u8(current),
            })
    }

    /// Run until `cancel` fires or a fatal fault occurs
    ///
    /// Cancellation returns `Ok(())`. A task already in flight is always
    /// allowed to finish. The scheduler ends in `Stopped` either way and
    /// cannot be run again.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), SchedulerError> {
        debug!("Scheduler::run: called");
        self.enter_running()?;
        let _guard = StateGuard {
            state: &self.state,
            on_exit: SchedulerState::Stopped,
        };

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            tasks = self.registry.len(),
            "Scheduler started"
        );

        let result = self.run_loop(&cancel).await;
        match &result {
            Ok(()) => info!("Scheduler stopped"),
            Err(e) => error!(error = %e, "Scheduler stopped on fatal fault"),
        }
        result
    }

    async fn run_loop(&self, cancel: &CancellationToken) -> Result<(), SchedulerError> {
        let poll_interval = self.config.poll_interval();

        loop {
            if cancel.is_cancelled() {
                debug!("Scheduler::run_loop: cancelled before cycle");
                return Ok(());
            }

            self.cycle(cancel).await?;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Scheduler::run_loop: cancelled while sleeping");
                    return Ok(());
                }
                _ = tokio::time::sleep(poll_interval) => {}
            }
        }
    }

    /// Run exactly one cycle on an idle scheduler
    ///
    /// The scheduler returns to `Idle` afterwards, or to `Stopped` on a fatal
    /// fault. Fails with `AlreadyStarted` while `run` is active.
    pub async fn run_once(&self, cancel: &CancellationToken) -> Result<CycleReport, SchedulerError> {
        debug!("Scheduler::run_once: called");
        self.enter_running()?;
        let mut guard = StateGuard {
            state: &self.state,
            on_exit: SchedulerState::Idle,
        };

        let result = self.cycle(cancel).await;
        if result.is_err() {
            guard.on_exit = SchedulerState::Stopped;
        }
        result
    }

    /// Spawn `run` onto the tokio runtime
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> SchedulerHandle {
        debug!("Scheduler::spawn: called");
        let token = cancel.clone();
        let join = tokio::spawn(async move { self.run(token).await });
        SchedulerHandle::new(cancel, join)
    }

    async fn cycle(&self, cancel: &CancellationToken) -> Result<CycleReport, SchedulerError> {
        let snapshot = self.registry.snapshot();
        let now = self.clock.now()?;
        let due = due_in_order(&snapshot, now);

        debug!(snapshot = snapshot.len(), due = due.len(), %now, "Scheduler::cycle: evaluated");

        let mut report = CycleReport {
            evaluated_at: Some(now),
            snapshot_len: snapshot.len(),
            due: due.len(),
            ..Default::default()
        };

        let result = self.execute_due(&due, cancel, &mut report).await;
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).record(&report);
        result.map(|()| report)
    }

    async fn execute_due(
        &self,
        due: &[Arc<Task>],
        cancel: &CancellationToken,
        report: &mut CycleReport,
    ) -> Result<(), SchedulerError> {
        for (index, task) in due.iter().enumerate() {
            if cancel.is_cancelled() {
                report.skipped = due.len() - index;
                debug!(skipped = report.skipped, "Scheduler::cycle: cancelled mid-cycle");
                break;
            }

            report.executed.push(task.name().to_string());
            let started = Instant::now();
            match executor::execute(task).await {
                Ok(elapsed) => {
                    // A clock fault here leaves the run unrecorded on the task
                    // and out of `succeeded`
                    let finished_at = self.clock.now()?;
                    task.record_success(finished_at);
                    report.succeeded.push(task.name().to_string());
                    debug!(name = %task.name(), ?elapsed, "Task completed");
                }
                Err(error) => {
                    let consecutive_failures = task.record_failure();
                    report.failed.push(task.name().to_string());
                    self.reporter.report(&TaskFailure {
                        task_id: task.id(),
                        task: task.name().to_string(),
                        priority: task.priority(),
                        consecutive_failures,
                        elapsed: started.elapsed(),
                        error,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Select the tasks due at `now` and order them for execution
///
/// Higher priority first; equal priorities by earliest [`Task::due_key`]
/// (never-run tasks first, shortest interval leading); remaining ties keep
/// insertion order.
pub fn due_in_order(tasks: &[Arc<Task>], now: DateTime<Utc>) -> Vec<Arc<Task>> {
    let mut due: Vec<Arc<Task>> = tasks.iter().filter(|t| t.is_due(now)).cloned().collect();
    due.sort_by(|a, b| {
        b.priority()
            .cmp(&a.priority())
            .then_with(|| a.due_key().cmp(&b.due_key()))
    });
    due
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::Priority;
    use crate::scheduler::clock::ManualClock;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).unwrap()
    }

    fn noop(name: &str, priority: Priority, interval_secs: u64) -> Task {
        Task::new(name, priority, Duration::from_secs(interval_secs), || async { Ok(()) })
    }

    fn names(tasks: &[Arc<Task>]) -> Vec<&str> {
        tasks.iter().map(|t| t.name()).collect()
    }

    #[test]
    fn test_due_in_order_priority_then_next_due() {
        let tasks = vec![
            Arc::new(noop("a", Priority::High, 2).with_last_run(at(-5))),
            Arc::new(noop("b", Priority::Normal, 2).with_last_run(at(-9))),
            Arc::new(noop("c", Priority::High, 2).with_last_run(at(-8))),
        ];

        assert_eq!(names(&due_in_order(&tasks, at(0))), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_due_in_order_never_run_first_and_stable() {
        let tasks = vec![
            Arc::new(noop("ran", Priority::Normal, 1).with_last_run(at(-10))),
            Arc::new(noop("fresh-1", Priority::Normal, 1)),
            Arc::new(noop("fresh-2", Priority::Normal, 1)),
            Arc::new(noop("low", Priority::Low, 1)),
        ];

        assert_eq!(
            names(&due_in_order(&tasks, at(0))),
            vec!["fresh-1", "fresh-2", "ran", "low"]
        );
    }

    #[test]
    fn test_due_in_order_never_run_shorter_interval_first() {
        let tasks = vec![
            Arc::new(noop("slow", Priority::Normal, 10)),
            Arc::new(noop("fast", Priority::Normal, 1)),
            Arc::new(noop("ran", Priority::Normal, 1).with_last_run(at(-10))),
        ];

        assert_eq!(names(&due_in_order(&tasks, at(0))), vec!["fast", "slow", "ran"]);
    }

    #[test]
    fn test_due_in_order_filters_not_due() {
        let tasks = vec![
            Arc::new(noop("waiting", Priority::High, 10).with_last_run(at(-3))),
            Arc::new(noop("due", Priority::Low, 3).with_last_run(at(-3))),
        ];

        assert_eq!(names(&due_in_order(&tasks, at(0))), vec!["due"]);
    }

    #[tokio::test]
    async fn test_run_once_updates_last_run_from_fresh_clock_read() {
        let clock = Arc::new(ManualClock::new(at(0)));
        let work_clock = Arc::clone(&clock);
        let scheduler = Scheduler::new(SchedulerConfig::default()).with_clock(clock.clone());
        scheduler.add(Task::new("slow", Priority::Normal, Duration::from_secs(5), move || {
            let clock = Arc::clone(&work_clock);
            async move {
                clock.advance(Duration::from_secs(2));
                Ok(())
            }
        }));

        let report = scheduler.run_once(&CancellationToken::new()).await.unwrap();
        assert_eq!(report.evaluated_at, Some(at(0)));
        assert_eq!(report.executed, vec!["slow"]);
        assert_eq!(scheduler.list_tasks()[0].last_run, Some(at(2)));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }

    #[tokio::test]
    async fn test_run_once_rejected_after_stop() {
        let scheduler = Scheduler::new(SchedulerConfig::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        scheduler.run(cancel.clone()).await.unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        let err = scheduler.run_once(&cancel).await.unwrap_err();
        assert!(err.is_already_started());
    }

    /// Answers `reads` times, then faults
    struct FadingClock {
        at: DateTime<Utc>,
        reads: std::sync::atomic::AtomicUsize,
    }

    impl Clock for FadingClock {
        fn now(&self) -> Result<DateTime<Utc>, crate::scheduler::ClockError> {
            let left = self.reads.fetch_sub(1, Ordering::SeqCst);
            if left == 0 {
                self.reads.store(0, Ordering::SeqCst);
                return Err(crate::scheduler::ClockError::Unavailable("gone".to_string()));
            }
            Ok(self.at)
        }
    }

    #[tokio::test]
    async fn test_clock_fault_after_success_leaves_run_unrecorded() {
        let clock = Arc::new(FadingClock {
            at: at(0),
            reads: std::sync::atomic::AtomicUsize::new(1),
        });
        let scheduler = Scheduler::new(SchedulerConfig::default()).with_clock(clock);
        scheduler.add(noop("a", Priority::Normal, 1));

        let err = scheduler.run_once(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, SchedulerError::Clock(_)));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        let task = &scheduler.list_tasks()[0];
        assert_eq!(task.runs, 0);
        assert_eq!(task.last_run, None);

        let stats = scheduler.stats();
        assert_eq!(stats.tasks_run, 1);
        assert_eq!(stats.tasks_succeeded, task.runs);
        assert_eq!(stats.tasks_failed, 0);
    }

    #[tokio::test]
    async fn test_stats_accumulate() {
        let clock = Arc::new(ManualClock::new(at(0)));
        let scheduler = Scheduler::new(SchedulerConfig::default()).with_clock(clock.clone());
        scheduler.add(noop("a", Priority::High, 1));
        scheduler.add(Task::new("b", Priority::Low, Duration::from_secs(1), || async {
            Err(eyre::eyre!("nope"))
        }));

        let cancel = CancellationToken::new();
        scheduler.run_once(&cancel).await.unwrap();
        clock.advance(Duration::from_secs(1));
        scheduler.run_once(&cancel).await.unwrap();

        let stats = scheduler.stats();
        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.tasks_run, 4);
        assert_eq!(stats.tasks_succeeded, 2);
        assert_eq!(stats.tasks_failed, 2);
        assert_eq!(stats.last_cycle_at, Some(at(1)));
    }
}
