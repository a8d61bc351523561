//! Where "today" comes from. Date validators never read the system time
//! directly so screens (and tests) can pin the date.

use chrono::{Local, NaiveDate};

pub trait Clock: Send + Sync {
    /// The current local calendar day
    fn today(&self) -> NaiveDate;
}

/// Local system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always returns the same day
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
