//! Scheduler error types

use thiserror::Error;

use super::cycle::SchedulerState;

/// Faults raised by a [`Clock`](super::Clock)
#[derive(Debug, Error)]
pub enum ClockError {
    #[error("Clock unavailable: {0}")]
    Unavailable(String),

    #[error("Clock reading out of range: {0}")]
    OutOfRange(String),
}

/// Loop-level faults that stop the scheduler
///
/// Task failures never show up here; they are reported and retried.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler cannot start from state {state}")]
    AlreadyStarted { state: SchedulerState },

    #[error("Clock fault: {0}")]
    Clock(#[from] ClockError),

    #[error("Scheduler loop aborted: {0}")]
    Aborted(String),
}

impl SchedulerError {
    /// Check if the scheduler was started twice
    pub fn is_already_started(&self) -> bool {
        matches!(self, SchedulerError::AlreadyStarted { .. })
    }
}

/// Why a single task invocation failed
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{0:#}")]
    Failed(eyre::Report),

    #[error("panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }
}
