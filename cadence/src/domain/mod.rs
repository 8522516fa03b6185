//! Domain types for recurring tasks

mod priority;
mod task;

pub use priority::Priority;
pub use task::{Task, TaskInfo, WorkFuture};
