//! Time sources for cache expiry.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Source of the current time.
///
/// The response cache reads time only through this trait so tests can drive
/// expiry with simulated time instead of sleeping.
pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Manually advanced clock, stored as milliseconds since the Unix epoch.
#[derive(Debug, Default)]
pub struct ManualClock {
  millis: AtomicI64,
}

impl ManualClock {
  /// Create a clock frozen at `millis` milliseconds after the epoch.
  pub fn at_millis(millis: i64) -> Self {
    Self {
      millis: AtomicI64::new(millis),
    }
  }

  /// Move the clock forward.
  pub fn advance(&self, by: Duration) {
    self
      .millis
      .fetch_add(by.num_milliseconds(), Ordering::SeqCst);
  }

  pub fn set_millis(&self, millis: i64) {
    self.millis.store(millis, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
  }
}
