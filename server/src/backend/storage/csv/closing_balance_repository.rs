//! Closing-balance index stored as `closing_balances.csv` (`day,balance`).

use anyhow::{anyhow, Result};
use csv::{ReaderBuilder, WriterBuilder};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::str::FromStr;

use super::connection::{CsvConnection, CLOSING_BALANCES_HEADER};
use crate::backend::domain::day_key::DayKey;

#[derive(Debug, Serialize, Deserialize)]
struct ClosingBalanceRecord {
    day: String,
    balance: String,
}

#[derive(Clone)]
pub struct ClosingBalanceRepository {
    connection: CsvConnection,
}

impl ClosingBalanceRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self { connection }
    }

    pub fn read_index(&self) -> Result<BTreeMap<DayKey, Decimal>> {
        let path = self.connection.closing_balances_file_path();
        self.connection.ensure_csv_file_exists(&path, CLOSING_BALANCES_HEADER)?;

        let file = File::open(&path)?;
        let mut csv_reader = ReaderBuilder::new().from_reader(BufReader::new(file));
        let mut index = BTreeMap::new();

        for result in csv_reader.deserialize::<ClosingBalanceRecord>() {
            let record = result?;
            let parsed = DayKey::parse(&record.day)
                .map_err(anyhow::Error::from)
                .and_then(|day| {
                    Decimal::from_str(&record.balance)
                        .map(|balance| (day, balance))
                        .map_err(|e| anyhow!("Invalid balance '{}': {}", record.balance, e))
                });
            match parsed {
                Ok((day, balance)) => {
                    index.insert(day, balance);
                }
                // The index is rebuildable, a bad row only costs a recalculation
                Err(e) => warn!("Skipping closing balance row for '{}': {}", record.day, e),
            }
        }
        Ok(index)
    }

    pub fn write_index(&self, index: &BTreeMap<DayKey, Decimal>) -> Result<()> {
        let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        csv_writer.write_record(["day", "balance"])?;
        for (day, balance) in index {
            csv_writer.serialize(ClosingBalanceRecord {
                day: day.to_string(),
                balance: balance.to_string(),
            })?;
        }
        let contents = csv_writer
            .into_inner()
            .map_err(|e| anyhow!("Failed to flush closing balances: {}", e))?;

        let path = self.connection.closing_balances_file_path();
        self.connection.write_atomically(&path, &contents)?;
        debug!("Wrote {} closing balances to {}", index.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::csv::test_utils::TestEnvironment;
    use rust_decimal_macros::dec;

    #[test]
    fn test_write_and_read_index() {
        let env = TestEnvironment::new().unwrap();
        let repo = ClosingBalanceRepository::new(env.connection.clone());
        let mut index = BTreeMap::new();
        index.insert(DayKey::parse("2024-01-03").unwrap(), dec!(-4.5));
        index.insert(DayKey::parse("2024-01-01").unwrap(), dec!(100));
        repo.write_index(&index).unwrap();

        let contents = std::fs::read_to_string(env.connection.closing_balances_file_path()).unwrap();
        assert_eq!(contents, "day,balance\n2024-01-01,100\n2024-01-03,-4.5\n");
        assert_eq!(repo.read_index().unwrap(), index);
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let env = TestEnvironment::new().unwrap();
        std::fs::write(
            env.connection.closing_balances_file_path(),
            "day,balance\n2024-01-01,10\nyesterday,5\n2024-01-02,lots\n",
        )
        .unwrap();
        let index = ClosingBalanceRepository::new(env.connection.clone()).read_index().unwrap();
        assert_eq!(index.len(), 1);
    }
}
