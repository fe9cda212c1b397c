use chrono::{DateTime, Days, NaiveDate, Utc};

/// Source of "now" for quiz timestamps and streak days.
///
/// Streaks are counted in UTC calendar days, so `today` is what evaluation
/// compares against a profile's last quiz date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Clock {
    #[default]
    System,
    Frozen(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn system() -> Self {
        Self::System
    }

    #[must_use]
    pub fn frozen(at: DateTime<Utc>) -> Self {
        Self::Frozen(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Self::System => Utc::now(),
            Self::Frozen(at) => *at,
        }
    }

    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    /// Move a frozen clock forward by whole days, keeping the time of day.
    /// The system clock ignores this.
    pub fn advance_days(&mut self, days: u64) {
        if let Self::Frozen(at) = self {
            *at = at.checked_add_days(Days::new(days)).unwrap_or(*at);
        }
    }
}

/// Unix seconds of the reference instant used in tests (2023-11-14T22:13:20Z).
pub const TEST_INSTANT_SECS: i64 = 1_700_000_000;

/// Reference instant for deterministic tests.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::from_timestamp(TEST_INSTANT_SECS, 0).unwrap_or_default()
}

/// A clock frozen at [`fixed_now`].
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::frozen(fixed_now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frozen_clock_steps_whole_days() {
        let mut clock = fixed_clock();
        let start = clock.today();
        clock.advance_days(2);
        assert_eq!(clock.today(), start.checked_add_days(Days::new(2)).unwrap());
        assert_eq!(clock.now().time(), fixed_now().time());
    }

    #[test]
    fn system_clock_ignores_advance() {
        let mut clock = Clock::system();
        clock.advance_days(3);
        assert_eq!(clock, Clock::System);
    }

    #[test]
    fn reference_day_is_utc() {
        assert_eq!(
            fixed_clock().today(),
            NaiveDate::from_ymd_opt(2023, 11, 14).unwrap()
        );
    }
}
