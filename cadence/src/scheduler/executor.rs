//! Execution adapter - runs one task invocation in isolation

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

use futures::FutureExt;
use tokio::time::Instant;
use tracing::debug;

use super::error::TaskError;
use crate::domain::Task;

/// Invoke a task's work unit exactly once
///
/// Returned errors and panics are both captured as [`TaskError`]; nothing
/// escapes to the caller. On success returns how long the run took.
pub async fn execute(task: &Task) -> Result<Duration, TaskError> {
    debug!(name = %task.name(), "execute: called");
    let started = Instant::now();

    // Calling the work fn happens inside the wrapped future so that a panic
    // while building the future is caught too.
    let outcome = AssertUnwindSafe(async { task.start().await }).catch_unwind().await;
    let elapsed = started.elapsed();

    match outcome {
        Ok(Ok(())) => {
            debug!(name = %task.name(), ?elapsed, "execute: succeeded");
            Ok(elapsed)
        }
        Ok(Err(report)) => {
            debug!(name = %task.name(), ?elapsed, "execute: returned error");
            Err(TaskError::Failed(report))
        }
        Err(payload) => {
            debug!(name = %task.name(), ?elapsed, "execute: panicked");
            Err(TaskError::Panicked(panic_message(payload.as_ref())))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
