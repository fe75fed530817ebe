//! # Entry Repository
//!
//! All ledger entries live in one `entries.csv`, one row per entry:
//!
//! ```csv
//! id,day,type,amount,note,timestamp
//! 5f0c...,2024-01-02,allowance,100,,2024-01-02T00:00:00-05:00
//! 9a1e...,2024-01-02,spend,-12.50,Comic book,2024-01-02T16:10:03-05:00
//! ```
//!
//! The file is rewritten as a whole on every change, so a row that does not
//! parse fails the read instead of being dropped by the next write.

use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use log::{debug, error};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::str::FromStr;

use super::connection::{CsvConnection, ENTRIES_HEADER};
use crate::backend::domain::day_key::DayKey;
use crate::backend::domain::models::{EntryId, EntryType, LedgerEntry};

pub type Ledger = BTreeMap<DayKey, BTreeMap<EntryId, LedgerEntry>>;

/// Row layout of `entries.csv`
#[derive(Debug, Serialize, Deserialize)]
struct EntryRecord {
    id: String,
    day: String,
    #[serde(rename = "type")]
    entry_type: String,
    amount: String,
    note: Option<String>,
    timestamp: String,
}

impl EntryRecord {
    fn from_entry(day: &DayKey, entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            day: day.to_string(),
            entry_type: entry.entry_type.to_string(),
            amount: entry.amount.to_string(),
            note: entry.note.clone(),
            timestamp: entry.timestamp.to_rfc3339(),
        }
    }

    fn into_entry(self) -> Result<(DayKey, LedgerEntry)> {
        let day = DayKey::parse(&self.day)?;
        let entry = LedgerEntry {
            id: EntryId::new(self.id),
            entry_type: EntryType::from_str(&self.entry_type)?,
            amount: Decimal::from_str(&self.amount)
                .map_err(|e| anyhow!("Invalid amount '{}': {}", self.amount, e))?,
            note: self.note.filter(|note| !note.is_empty()),
            timestamp: chrono::DateTime::parse_from_rfc3339(&self.timestamp)?,
        };
        Ok((day, entry))
    }
}

#[derive(Clone)]
pub struct EntryRepository {
    connection: CsvConnection,
}

impl EntryRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    /// Read every entry, grouped by day
    pub fn read_ledger(&self) -> Result<Ledger> {
        let path = self.connection.entries_file_path();
        self.connection.ensure_csv_file_exists(&path, ENTRIES_HEADER)?;

        let file = File::open(&path)?;
        let mut csv_reader = ReaderBuilder::new().from_reader(BufReader::new(file));
        let mut ledger = Ledger::new();

        for (line, result) in csv_reader.deserialize::<EntryRecord>().enumerate() {
            let (day, entry) = result
                .map_err(anyhow::Error::from)
                .and_then(EntryRecord::into_entry)
                .inspect_err(|e| error!("Failed to parse entry record {} in {}: {}", line + 1, path.display(), e))
                .with_context(|| format!("Malformed entry record {} in {}", line + 1, path.display()))?;
            ledger.entry(day).or_default().insert(entry.id.clone(), entry);
        }
        Ok(ledger)
    }

    /// Replace the file with `ledger`
    pub fn write_ledger(&self, ledger: &Ledger) -> Result<()> {
        let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        csv_writer.write_record(["id", "day", "type", "amount", "note", "timestamp"])?;
        let mut count = 0;
        for (day, bucket) in ledger {
            for entry in bucket.values() {
                csv_writer.serialize(EntryRecord::from_entry(day, entry))?;
                count += 1;
            }
        }
        let contents = csv_writer.into_inner().map_err(|e| anyhow!("Failed to flush entries: {}", e))?;

        let path = self.connection.entries_file_path();
        self.connection.write_atomically(&path, &contents)?;
        debug!("Wrote {} entries to {}", count, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::NewLedgerEntry;
    use crate::backend::storage::csv::test_utils::TestEnvironment;
    use chrono::DateTime;
    use rust_decimal_macros::dec;

    fn day(s: &str) -> DayKey {
        DayKey::parse(s).unwrap()
    }

    #[test]
    fn test_empty_file_reads_as_empty_ledger() {
        let env = TestEnvironment::new().unwrap();
        let repo = EntryRepository::new(env.connection.clone());
        assert!(repo.read_ledger().unwrap().is_empty());
        let contents = std::fs::read_to_string(env.connection.entries_file_path()).unwrap();
        assert_eq!(contents, ENTRIES_HEADER);
    }

    #[test]
    fn test_write_and_read_ledger() {
        let env = TestEnvironment::new().unwrap();
        let repo = EntryRepository::new(env.connection.clone());
        let at = DateTime::parse_from_rfc3339("2024-01-02T16:10:03-05:00").unwrap();

        let mut ledger = Ledger::new();
        let spend = NewLedgerEntry::spend(dec!(12.50), Some("Comic, \"deluxe\"".to_string()), at)
            .with_id(EntryId::new("s1"));
        let allowance = NewLedgerEntry::allowance(dec!(100), at).with_id(EntryId::new("a1"));
        let bucket = ledger.entry(day("2024-01-02")).or_default();
        bucket.insert(spend.id.clone(), spend);
        bucket.insert(allowance.id.clone(), allowance);

        repo.write_ledger(&ledger).unwrap();
        let read_back = repo.read_ledger().unwrap();
        assert_eq!(read_back, ledger);
    }

    #[test]
    fn test_malformed_rows_fail_the_read() {
        let env = TestEnvironment::new().unwrap();
        let repo = EntryRepository::new(env.connection.clone());
        for bad_row in [
            "bad-day,2024-1-3,bonus,5,,2024-01-03T10:00:00+00:00",
            "bad-type,2024-01-03,refund,5,,2024-01-03T10:00:00+00:00",
            "bad-amount,2024-01-03,bonus,5.0.0,,2024-01-03T10:00:00+00:00",
        ] {
            std::fs::write(
                env.connection.entries_file_path(),
                format!(
                    "id,day,type,amount,note,timestamp\nok,2024-01-03,bonus,5,,2024-01-03T10:00:00+00:00\n{}\n",
                    bad_row
                ),
            )
            .unwrap();
            assert!(repo.read_ledger().is_err(), "{}", bad_row);
        }
    }
}
