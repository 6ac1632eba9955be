//! Clock capability injected into the engine.
//!
//! Catch-up scheduling and overdue detection depend on "today". Reading
//! wall-clock time inline would make those paths untestable, so the engine
//! takes a [`Clock`] at build time: [`SystemClock`] in production, a
//! [`FixedClock`] in tests.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};

/// Source of the current time for the engine.
pub trait Clock: fmt::Debug + Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Current calendar date in UTC.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a given instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
