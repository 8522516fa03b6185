//! SchedulerHandle - control surface for a spawned scheduler

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::SchedulerError;

/// Handle to a scheduler running on the tokio runtime
///
/// Requesting a stop and waiting for the loop to finish are separate steps:
/// `stop` only signals, `join` resolves once the in-flight task (if any) has
/// finished and the loop has returned.
#[derive(Debug)]
pub struct SchedulerHandle {
    cancel: CancellationToken,
    join: JoinHandle<Result<(), SchedulerError>>,
}

impl SchedulerHandle {
    pub(crate) fn new(cancel: CancellationToken, join: JoinHandle<Result<(), SchedulerError>>) -> Self {
        Self { cancel, join }
    }

    /// Request cancellation without waiting
    pub fn stop(&self) {
        debug!("SchedulerHandle::stop: called");
        self.cancel.cancel();
    }

    /// The token observed by the loop
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the loop has returned
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the loop to return
    pub async fn join(self) -> Result<(), SchedulerError> {
        debug!("SchedulerHandle::join: called");
        match self.join.await {
            Ok(result) => result,
            Err(e) => Err(SchedulerError::Aborted(e.to_string())),
        }
    }

    /// Request cancellation and wait for the loop to return
    pub async fn shutdown(self) -> Result<(), SchedulerError> {
        self.stop();
        self.join().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::scheduler::{Scheduler, SchedulerConfig, SchedulerState};

    #[tokio::test]
    async fn test_stop_then_join() {
        let scheduler = Arc::new(Scheduler::new(SchedulerConfig { poll_interval_ms: 10 }));
        let handle = Arc::clone(&scheduler).spawn(CancellationToken::new());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!handle.is_stop_requested());
        assert_eq!(scheduler.state(), SchedulerState::Running);

        handle.stop();
        assert!(handle.is_stop_requested());

        tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .expect("scheduler should stop")
            .unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_external_token_stops_loop() {
        let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default()));
        let cancel = CancellationToken::new();
        let handle = Arc::clone(&scheduler).spawn(cancel.clone());

        cancel.cancel();
        assert!(handle.cancel_token().is_cancelled());
        handle.join().await.unwrap();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[tokio::test]
    async fn test_abort_reported_as_error() {
        let scheduler = Arc::new(Scheduler::new(SchedulerConfig::default()));
        let handle = Arc::clone(&scheduler).spawn(CancellationToken::new());
        handle.join.abort();

        let err = handle.join().await.unwrap_err();
        assert!(matches!(err, SchedulerError::Aborted(_)));
    }
}
