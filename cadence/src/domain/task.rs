//! Task - a named, prioritized unit of recurring work

use std::future::Future;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::priority::Priority;

/// Future returned by a task's work unit
pub type WorkFuture = BoxFuture<'static, eyre::Result<()>>;

type WorkFn = Box<dyn Fn() -> WorkFuture + Send + Sync>;

/// Sentinel stored in `last_run_us` until the first successful run
const NEVER_RUN: i64 = i64::MIN;

/// A recurring task
///
/// Identity (name, priority, interval) is fixed at construction. Run state
/// lives in atomics so that registry snapshots shared across threads can read
/// it without locking; only the scheduler loop writes it.
pub struct Task {
    id: Uuid,
    name: String,
    priority: Priority,
    interval: Duration,
    work: WorkFn,

    /// Microseconds since the Unix epoch of the last successful run
    last_run_us: AtomicI64,
    runs: AtomicU64,
    failures: AtomicU64,
    consecutive_failures: AtomicU64,
}

impl Task {
    /// Create a task that has never run
    pub fn new<F, Fut>(name: impl Into<String>, priority: Priority, interval: Duration, work: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = eyre::Result<()>> + Send + 'static,
    {
        let name = name.into();
        debug!(%name, ?priority, ?interval, "Task::new: called");
        Self {
            id: Uuid::now_v7(),
            name,
            priority,
            interval,
            work: Box::new(move || work().boxed()),
            last_run_us: AtomicI64::new(NEVER_RUN),
            runs: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            consecutive_failures: AtomicU64::new(0),
        }
    }

    /// Seed the last successful run, e.g. to resume a known cadence
    pub fn with_last_run(self, at: DateTime<Utc>) -> Self {
        self.last_run_us.store(at.timestamp_micros(), Ordering::Release);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time of the last successful run, `None` if it never ran
    pub fn last_run(&self) -> Option<DateTime<Utc>> {
        match self.last_run_us.load(Ordering::Acquire) {
            NEVER_RUN => None,
            us => DateTime::from_timestamp_micros(us),
        }
    }

    /// Earliest time the task becomes due again, `None` if it never ran
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.last_run().map(|_| self.due_key())
    }

    /// `last_run + interval`, counting a never-run task from the earliest
    /// representable time
    ///
    /// Orders tasks of equal priority: the smaller key runs first, so among
    /// never-run tasks the shorter interval wins.
    pub fn due_key(&self) -> DateTime<Utc> {
        let base = self.last_run().unwrap_or(DateTime::<Utc>::MIN_UTC);
        TimeDelta::from_std(self.interval)
            .ok()
            .and_then(|interval| base.checked_add_signed(interval))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether `now - last_run >= interval`
    ///
    /// A clock that stepped backwards counts as zero elapsed time.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let Some(last) = self.last_run() else {
            return true;
        };
        let Ok(interval) = TimeDelta::from_std(self.interval) else {
            return false;
        };
        let elapsed = now.signed_duration_since(last).max(TimeDelta::zero());
        elapsed >= interval
    }

    /// Successful runs so far
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Failed runs so far
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn consecutive_failures(&self) -> u64 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Start one invocation of the work unit
    pub(crate) fn start(&self) -> WorkFuture {
        (self.work)()
    }

    /// Record a successful run finishing at `finished_at`
    ///
    /// `last_run` never moves backwards, even if the clock does.
    pub(crate) fn record_success(&self, finished_at: DateTime<Utc>) {
        debug!(name = %self.name, %finished_at, "Task::record_success: called");
        self.last_run_us
            .fetch_max(finished_at.timestamp_micros(), Ordering::AcqRel);
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.store(0, Ordering::Relaxed);
    }

    /// Record a failed run; returns the consecutive failure count
    pub(crate) fn record_failure(&self) -> u64 {
        debug!(name = %self.name, "Task::record_failure: called");
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Read-only descriptor for introspection
    pub fn info(&self) -> TaskInfo {
        TaskInfo {
            id: self.id,
            name: self.name.clone(),
            priority: self.priority,
            interval: self.interval,
            last_run: self.last_run(),
            runs: self.runs(),
            failures: self.failures(),
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("interval", &self.interval)
            .field("last_run", &self.last_run())
            .finish_non_exhaustive()
    }
}

/// Snapshot of a task's identity and run state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub id: Uuid,
    pub name: String,
    pub priority: Priority,
    pub interval: Duration,
    pub last_run: Option<DateTime<Utc>>,
    pub runs: u64,
    pub failures: u64,
}
