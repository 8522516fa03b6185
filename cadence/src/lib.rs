//! Cadence - recurring, priority-ordered task scheduler
//!
//! Cadence keeps a registry of periodic tasks, each with a priority and an
//! interval, and runs the due ones in priority order until cancelled.
//!
//! # Core Concepts
//!
//! - **Due-ness**: a task is due once `now - last_run >= interval`
//! - **Ordering**: High before Normal before Low; ties go to the task whose
//!   next due time is earliest
//! - **Isolation**: a failing or panicking task is reported and retried next
//!   cycle; it never stops the loop
//! - **Cooperative stop**: a `CancellationToken` is checked before every task
//!   and interrupts the sleep between cycles
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use cadence::{Priority, Scheduler, SchedulerConfig, Task};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), cadence::SchedulerError> {
//! let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default()));
//! scheduler.add(Task::new("heartbeat", Priority::High, Duration::from_secs(2), || async {
//!     Ok(())
//! }));
//!
//! let handle = Arc::clone(&scheduler).spawn(CancellationToken::new());
//! tokio::time::sleep(Duration::from_secs(10)).await;
//! handle.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`domain`] - Task and priority types
//! - [`scheduler`] - Registry, loop, execution adapter, clocks
//! - [`jobs`] - Work units used by the `cadence` binary
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod jobs;
pub mod scheduler;

// Re-export commonly used types
pub use config::{Config, LogConfig, TaskSpec};
pub use domain::{Priority, Task, TaskInfo};
pub use scheduler::{
    Clock, ClockError, CycleReport, FailureReporter, ManualClock, MonotonicClock, Scheduler, SchedulerConfig,
    SchedulerError, SchedulerHandle, SchedulerState, SchedulerStats, SystemClock, TaskError, TaskFailure,
    TaskRegistry, TracingReporter,
};
