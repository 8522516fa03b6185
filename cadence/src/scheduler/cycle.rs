//! Cycle bookkeeping for the scheduler

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of a scheduler: `Idle -> Running -> Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

impl SchedulerState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Running => 1,
            Self::Stopped => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            _ => Self::Stopped,
        }
    }
}

impl std::fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Outcome of one scheduler cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    /// Clock reading the due set was computed against
    pub evaluated_at: Option<DateTime<Utc>>,

    /// Tasks in the snapshot
    pub snapshot_len: usize,

    /// Tasks found due
    pub due: usize,

    /// Names of invoked tasks, in invocation order (failed ones included)
    pub executed: Vec<String>,

    /// Names of invoked tasks whose success was recorded
    pub succeeded: Vec<String>,

    /// Names of invoked tasks that failed
    pub failed: Vec<String>,

    /// Due tasks not started because cancellation was requested
    pub skipped: usize,
}

impl CycleReport {
    /// True when cancellation cut the cycle short
    pub fn was_interrupted(&self) -> bool {
        self.skipped > 0
    }
}

/// Running totals across cycles
#[derive(Debug, Default, Clone, Serialize)]
pub struct SchedulerStats {
    pub cycles: u64,
    pub tasks_run: u64,
    pub tasks_succeeded: u64,
    pub tasks_failed: u64,
    pub tasks_skipped: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
}

impl SchedulerStats {
    pub(crate) fn record(&mut self, report: &CycleReport) {
        self.cycles += 1;
        self.tasks_run += report.executed.len() as u64;
        self.tasks_failed += report.failed.len() as u64;
        self.tasks_succeeded += report.succeeded.len() as u64;
        self.tasks_skipped += report.skipped as u64;
        if report.evaluated_at.is_some() {
            self.last_cycle_at = report.evaluated_at;
        }
    }
}
