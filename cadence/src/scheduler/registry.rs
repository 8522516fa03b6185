//! Task registry shared between callers and the scheduler loop

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;
use uuid::Uuid;

use crate::domain::{Task, TaskInfo};

/// Insertion-ordered collection of tasks
///
/// Every operation holds the lock only for the copy/append/filter itself, so
/// callers on any thread can mutate the registry while the loop runs tasks.
/// Names are not required to be unique; `remove` drops every match.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Mutex<Vec<Arc<Task>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave the Vec half-modified,
    // so a poisoned lock is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<Task>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a task; returns its id
    pub fn add(&self, task: Task) -> Uuid {
        debug!(name = %task.name(), "TaskRegistry::add: called");
        let id = task.id();
        self.lock().push(Arc::new(task));
        id
    }

    /// Remove every task named `name`; returns how many were removed
    pub fn remove(&self, name: &str) -> usize {
        debug!(%name, "TaskRegistry::remove: called");
        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|t| t.name() != name);
        let removed = before - tasks.len();
        debug!(%name, removed, "TaskRegistry::remove: done");
        removed
    }

    /// Point-in-time copy of the registered tasks, in insertion order
    pub fn snapshot(&self) -> Vec<Arc<Task>> {
        self.lock().clone()
    }

    /// Descriptors of the registered tasks, in insertion order
    pub fn list(&self) -> Vec<TaskInfo> {
        self.snapshot().iter().map(|t| t.info()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().iter().any(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
