//! Failure reporting

use std::time::Duration;

use tracing::{error, warn};
use uuid::Uuid;

use super::error::TaskError;
use crate::domain::Priority;

/// One failed task invocation
#[derive(Debug)]
pub struct TaskFailure {
    pub task_id: Uuid,
    pub task: String,
    pub priority: Priority,
    /// Failures in a row, this one included
    pub consecutive_failures: u64,
    pub elapsed: Duration,
    pub error: TaskError,
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task '{}' failed: {}", self.task, self.error)
    }
}

/// Receives one report per failed task invocation
pub trait FailureReporter: Send + Sync {
    fn report(&self, failure: &TaskFailure);
}

/// Reports failures through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, failure: &TaskFailure) {
        if failure.error.is_panic() {
            error!(
                task = %failure.task,
                priority = %failure.priority,
                consecutive = failure.consecutive_failures,
                error = %failure.error,
                "Task panicked"
            );
        } else {
            warn!(
                task = %failure.task,
                priority = %failure.priority,
                consecutive = failure.consecutive_failures,
                elapsed_ms = failure.elapsed.as_millis() as u64,
                error = %failure.error,
                "Task failed"
            );
        }
    }
}
