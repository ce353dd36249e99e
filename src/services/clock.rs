//! Wall-clock source for due-date and overdue decisions

use std::sync::RwLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Current date/time, as seen by the engine
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Calendar date used for all date-only comparisons (UTC)
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Server system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: RwLock::new(now) }
    }

    /// Clock set to midnight UTC of `date`
    pub fn on(date: NaiveDate) -> Self {
        Self::new(Utc.from_utc_datetime(&date.and_time(NaiveTime::default())))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance_days(&self, days: i64) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += Duration::days(days);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}
