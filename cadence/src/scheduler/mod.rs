//! Recurring task scheduler
//!
//! Holds a registry of periodic tasks and, each cycle, runs the ones that are
//! due in priority order, one at a time, until cancelled.

mod clock;
mod config;
mod core;
mod cycle;
mod error;
mod executor;
mod handle;
mod registry;
mod report;

pub use clock::{Clock, ManualClock, MonotonicClock, SystemClock};
pub use config::SchedulerConfig;
pub use core::{Scheduler, due_in_order};
pub use cycle::{CycleReport, SchedulerState, SchedulerStats};
pub use error::{ClockError, SchedulerError, TaskError};
pub use executor::execute;
pub use handle::SchedulerHandle;
pub use registry::TaskRegistry;
pub use report::{FailureReporter, TaskFailure, TracingReporter};
