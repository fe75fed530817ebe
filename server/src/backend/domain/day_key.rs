//! Day key codec for the allowance ledger.
//!
//! Every per-day bucket of the ledger is addressed by a [`DayKey`]: the local
//! calendar date formatted as zero-padded `YYYY-MM-DD`. The fixed-width format
//! makes lexicographic order agree with chronological order, so keys can be
//! used directly as ordered map keys.
//!
//! Day arithmetic is always done on calendar dates, never by adding elapsed
//! hours, so a DST transition can neither skip nor repeat a day.

use chrono::{DateTime, Datelike, Days, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::LedgerError;

const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Canonical identifier of a calendar day (`YYYY-MM-DD`)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey {
    // `key` comes first so the derived ordering is the lexicographic one
    key: String,
    date: NaiveDate,
}

impl DayKey {
    /// Local calendar day of `instant` in `timezone`
    pub fn from_instant<Tz: TimeZone, Z: TimeZone>(instant: &DateTime<Tz>, timezone: &Z) -> Self {
        Self::from_date(instant.with_timezone(timezone).date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            key: date.format(DAY_KEY_FORMAT).to_string(),
            date,
        }
    }

    /// Parse a canonical `YYYY-MM-DD` key. Non-padded or impossible dates are rejected.
    pub fn parse(input: &str) -> Result<Self, LedgerError> {
        let trimmed = input.trim();
        let date = NaiveDate::parse_from_str(trimmed, DAY_KEY_FORMAT)
            .map_err(|_| LedgerError::InvalidDayKey(input.to_string()))?;
        let key = Self::from_date(date);
        if key.key != trimmed {
            return Err(LedgerError::InvalidDayKey(input.to_string()));
        }
        Ok(key)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, LedgerError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self::from_date)
            .ok_or_else(|| LedgerError::InvalidDayKey(format!("{:04}-{:02}-{:02}", year, month, day)))
    }

    pub fn as_str(&self) -> &str {
        &self.key
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Shift by `n` calendar days (negative goes back). Saturates at the
    /// limits of the supported calendar.
    pub fn add_days(&self, n: i64) -> Self {
        let shifted = if n >= 0 {
            self.date.checked_add_days(Days::new(n as u64))
        } else {
            self.date.checked_sub_days(Days::new(n.unsigned_abs()))
        };
        shifted.map(Self::from_date).unwrap_or_else(|| self.clone())
    }

    /// First instant of this day in `timezone`.
    ///
    /// When local midnight does not exist (a DST gap at midnight) the first
    /// valid local time of the day is returned instead.
    pub fn start_of_day<Tz: TimeZone>(&self, timezone: &Tz) -> DateTime<Tz> {
        let midnight = self.date.and_time(NaiveTime::MIN);
        match timezone.from_local_datetime(&midnight) {
            LocalResult::Single(instant) => instant,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => (1..=96)
                .find_map(|quarter| {
                    timezone
                        .from_local_datetime(&(midnight + Duration::minutes(15 * quarter)))
                        .earliest()
                })
                .unwrap_or_else(|| timezone.from_utc_datetime(&midnight)),
        }
    }

    /// Monday of the week containing this day
    pub fn week_start(&self) -> Self {
        let offset = self.date.weekday().num_days_from_monday() as i64;
        self.add_days(-offset)
    }

    pub fn first_of_month(year: i32, month: u32) -> Result<Self, LedgerError> {
        Self::from_ymd(year, month, 1)
    }

    pub fn last_of_month(year: i32, month: u32) -> Result<Self, LedgerError> {
        let first = Self::first_of_month(year, month)?;
        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        Ok(Self::first_of_month(next_year, next_month)
            .map(|next| next.add_days(-1))
            .unwrap_or_else(|_| first.add_days(30)))
    }

    /// Every day from `start` to `end`, both inclusive, in ascending order
    pub fn range_inclusive(start: &DayKey, end: &DayKey) -> Vec<DayKey> {
        let mut days = Vec::new();
        let mut cursor = start.clone();
        while cursor <= *end {
            let next = cursor.add_days(1);
            let saturated = next == cursor;
            days.push(cursor);
            if saturated {
                break;
            }
            cursor = next;
        }
        days
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl FromStr for DayKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DayKey {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DayKey> for String {
    fn from(key: DayKey) -> Self {
        key.key
    }
}

impl AsRef<str> for DayKey {
    fn as_ref(&self) -> &str {
        &self.key
    }
}
