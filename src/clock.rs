//! Source of "now" for scheduling and due checks.
//!
//! The review session never reads the system time directly; it asks its clock.
//! `FixedClock` replaces the old simulated `current_date` row and can be
//! advanced a day at a time to walk cards through their intervals.

use chrono::{DateTime, Days, Local, TimeZone};
use std::sync::Mutex;

pub trait Clock {
    /// Time zone whose calendar days the scheduler counts in.
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// Wall-clock time in the machine's local time zone.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Settable clock for tests and simulations.
#[derive(Debug)]
pub struct FixedClock<Tz: TimeZone> {
    now: Mutex<DateTime<Tz>>,
}

impl<Tz: TimeZone> FixedClock<Tz> {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Tz>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Moves the clock forward by whole calendar days.
    pub fn advance_days(&self, days: u64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(next) = now.clone().checked_add_days(Days::new(days)) {
            *now = next;
        }
    }
}

impl<Tz: TimeZone> Clock for FixedClock<Tz> {
    type Tz = Tz;

    fn now(&self) -> DateTime<Tz> {
        self.now.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    type Tz = C::Tz;

    fn now(&self) -> DateTime<Self::Tz> {
        (**self).now()
    }
}
