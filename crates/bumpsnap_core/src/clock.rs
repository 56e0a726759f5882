//! Clock collaborator.
//!
//! Core logic never reads the system time directly; it asks a `Clock`. Tests
//! use `FixedClock`, whose local projection is plain UTC so results do not
//! depend on the machine's time zone.

use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, Utc};
use std::cell::Cell;

pub trait Clock {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Projects an instant onto the local wall clock used for calendar math.
    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&Local).naive_local()
    }

    fn local_now(&self) -> NaiveDateTime {
        self.to_local(self.now())
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        (**self).to_local(instant)
    }
}

/// Wall clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock. Local time equals UTC.
#[derive(Debug)]
pub struct FixedClock {
    now: Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Cell::new(now),
        }
    }

    /// Creates a clock reading the given naive instant as UTC.
    pub fn at(local: NaiveDateTime) -> Self {
        Self::new(local.and_utc())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, delta: TimeDelta) {
        self.now.set(self.now.get() + delta);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.naive_utc()
    }
}
