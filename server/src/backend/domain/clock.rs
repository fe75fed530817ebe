//! Source of "now" for the ledger services.
//!
//! The backfill engine and the default booking day both depend on the
//! current calendar day in the account's zone, so services take a [`Clock`]
//! instead of reading the system time directly.

use chrono::{DateTime, Days, FixedOffset, Local, Offset, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use super::day_key::DayKey;

pub trait Clock: Send + Sync {
    /// Current instant in the account's zone
    fn now(&self) -> DateTime<FixedOffset>;

    /// Calendar day containing `now()`
    fn today(&self) -> DayKey;

    /// First instant of `day` in the account's zone
    fn start_of_day(&self, day: &DayKey) -> DateTime<FixedOffset>;
}

fn fixed<Tz: TimeZone>(instant: DateTime<Tz>) -> DateTime<FixedOffset> {
    let offset = instant.offset().fix();
    instant.with_timezone(&offset)
}

/// Wall clock in a given zone
#[derive(Debug, Clone)]
pub struct SystemClock<Tz: TimeZone> {
    timezone: Tz,
}

impl SystemClock<Local> {
    /// System time in the machine's local zone (DST aware)
    pub fn local() -> Self {
        Self { timezone: Local }
    }
}

impl SystemClock<FixedOffset> {
    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { timezone: offset }
    }
}

impl<Tz> Clock for SystemClock<Tz>
where
    Tz: TimeZone + Send + Sync,
    Tz::Offset: Send + Sync,
{
    fn now(&self) -> DateTime<FixedOffset> {
        fixed(Utc::now().with_timezone(&self.timezone))
    }

    fn today(&self) -> DayKey {
        DayKey::from_instant(&Utc::now(), &self.timezone)
    }

    fn start_of_day(&self, day: &DayKey) -> DateTime<FixedOffset> {
        fixed(day.start_of_day(&self.timezone))
    }
}

/// A clock frozen at a settable instant, for tests and replays
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<FixedOffset>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    /// Parse an RFC 3339 instant such as `2024-01-04T10:00:00+00:00`
    pub fn at(rfc3339: &str) -> anyhow::Result<Self> {
        Ok(Self::new(DateTime::parse_from_rfc3339(rfc3339)?))
    }

    pub fn advance_days(&self, days: u64) {
        if let Ok(mut guard) = self.now.lock() {
            if let Some(later) = guard.checked_add_days(Days::new(days)) {
                *guard = later;
            }
        }
    }

    fn current(&self) -> DateTime<FixedOffset> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.current()
    }

    fn today(&self) -> DayKey {
        let now = self.current();
        DayKey::from_instant(&now, now.offset())
    }

    fn start_of_day(&self, day: &DayKey) -> DateTime<FixedOffset> {
        day.start_of_day(self.current().offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_today_and_start_of_day() {
        let clock = FixedClock::at("2024-01-04T10:00:00-05:00").unwrap();
        assert_eq!(clock.today().as_str(), "2024-01-04");
        let start = clock.start_of_day(&DayKey::parse("2024-01-02").unwrap());
        assert_eq!(start.to_rfc3339(), "2024-01-02T00:00:00-05:00");
    }

    #[test]
    fn test_fixed_clock_advance() {
        let clock = FixedClock::at("2024-02-28T23:30:00+00:00").unwrap();
        clock.advance_days(1);
        assert_eq!(clock.today().as_str(), "2024-02-29");
        clock.advance_days(1);
        assert_eq!(clock.today().as_str(), "2024-03-01");
    }

    #[test]
    fn test_system_clock_agrees_with_its_zone() {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        let clock = SystemClock::with_offset(offset);
        let now = clock.now();
        assert_eq!(now.offset().local_minus_utc(), 3 * 3600);
        // `today` may roll over between the two calls only at midnight
        let today = clock.today();
        let from_now = DayKey::from_instant(&now, &offset);
        assert!(today == from_now || today == from_now.add_days(1));
    }
}
