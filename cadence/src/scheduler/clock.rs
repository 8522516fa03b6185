//! Wall-clock sources for due-ness decisions

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::Instant;

use super::error::ClockError;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<DateTime<Utc>, ClockError>;
}

/// The system wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<DateTime<Utc>, ClockError> {
        Ok(Utc::now())
    }
}

/// Wall clock anchored once and advanced by tokio's monotonic `Instant`
///
/// Never steps backwards, and follows tokio's paused time in tests.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    wall_origin: DateTime<Utc>,
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Anchor the clock so that "now" reads as `wall_origin`
    pub fn anchored_at(wall_origin: DateTime<Utc>) -> Self {
        Self {
            wall_origin,
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Result<DateTime<Utc>, ClockError> {
        let elapsed = TimeDelta::from_std(self.origin.elapsed()).map_err(|e| ClockError::OutOfRange(e.to_string()))?;
        self.wall_origin
            .checked_add_signed(elapsed)
            .ok_or_else(|| ClockError::OutOfRange(format!("{} + {}", self.wall_origin, elapsed)))
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = at;
    }

    /// Move the clock forward; saturates at the maximum representable time
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now = TimeDelta::from_std(by)
            .ok()
            .and_then(|by| now.checked_add_signed(by))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<DateTime<Utc>, ClockError> {
        Ok(*self.now.lock().unwrap_or_else(PoisonError::into_inner))
    }
}
