//! Wall-clock source for artifact keys. Injected so tests can pin time.

use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Local, NaiveTime, TimeZone};

/// Format of the timestamp embedded in artifact keys.
pub const KEY_TIME_FORMAT: &str = "%H%M%S";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;

    /// Current time as `HHMMSS`.
    fn timestamp(&self) -> String {
        self.now().format(KEY_TIME_FORMAT).to_string()
    }
}

/// The process's local clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock for tests. Returns the set time until told otherwise.
pub struct FixedClock {
    now: Mutex<DateTime<Local>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// A clock pinned to today's date at the given wall time.
    pub fn at(hour: u32, minute: u32, second: u32) -> Self {
        let time = NaiveTime::from_hms_opt(hour, minute, second).unwrap_or(NaiveTime::MIN);
        let naive = Local::now().date_naive().and_time(time);
        let now = Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(Local::now);
        Self::new(now)
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
