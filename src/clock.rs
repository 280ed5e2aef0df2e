use chrono::{DateTime, Days, NaiveDate, Utc};

/// Source of "now" for sync windows, watermarks and monthly series.
///
/// Injected everywhere time matters so tests can pin the calendar.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// The day after `today()`; upstream date windows end here to tolerate
    /// clock skew and same-day issuance.
    fn tomorrow(&self) -> NaiveDate {
        let today = self.today();
        today.checked_add_days(Days::new(1)).unwrap_or(today)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a single instant.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn tomorrow_rolls_over_month_end() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 31, 23, 59, 0).unwrap());
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(clock.tomorrow(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    }
}
