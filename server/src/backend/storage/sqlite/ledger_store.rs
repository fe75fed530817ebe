//! SQLite-backed [`LedgerStore`].
//!
//! Amounts and days are stored as TEXT so decimals survive exactly and days
//! sort lexicographically. Every `write_fields` call runs in one SQL
//! transaction.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

use crate::backend::domain::day_key::DayKey;
use crate::backend::domain::models::{
    AccountPatch, AccountState, EntryId, EntryType, LedgerEntry, LedgerSnapshot, NewLedgerEntry,
};
use crate::backend::storage::subscription::{SubscriberRegistry, Subscription};
use crate::backend::storage::traits::{ChangeListener, LedgerStore};

/// File name used inside the data directory
pub const DATABASE_FILE: &str = "ledger.db";

#[derive(Clone)]
pub struct SqliteLedgerStore {
    pool: SqlitePool,
    subscribers: SubscriberRegistry,
}

impl SqliteLedgerStore {
    /// Open (creating if missing) the database file at `path`
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        info!("Opened SQLite ledger at {}", path.as_ref().display());
        Self::from_pool(pool).await
    }

    /// Private in-memory database; one connection so every query sees it
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        Self::setup_schema(&pool).await?;
        Ok(Self {
            pool,
            subscribers: SubscriberRegistry::new(),
        })
    }

    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS account (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                current_balance TEXT NOT NULL,
                daily_allowance TEXT NOT NULL,
                last_processed_date TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS entries (
                id TEXT PRIMARY KEY,
                day TEXT NOT NULL,
                entry_type TEXT NOT NULL,
                amount TEXT NOT NULL,
                note TEXT,
                timestamp TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_day ON entries(day);")
            .execute(pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS closing_balances (
                day TEXT PRIMARY KEY,
                balance TEXT NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    async fn notify_listeners(&self) -> Result<()> {
        if self.subscribers.listener_count() > 0 {
            let snapshot = self.read_all().await?;
            self.subscribers.notify(&snapshot);
        }
        Ok(())
    }
}

fn decimal(row: &SqliteRow, column: &str) -> Result<Decimal> {
    let text: String = row.try_get(column)?;
    Decimal::from_str(&text).map_err(|e| anyhow!("Invalid decimal '{}' in column {}: {}", text, column, e))
}

fn day_key(row: &SqliteRow, column: &str) -> Result<DayKey> {
    let text: String = row.try_get(column)?;
    Ok(DayKey::parse(&text)?)
}

fn account_from_row(row: &SqliteRow) -> Result<AccountState> {
    Ok(AccountState {
        current_balance: decimal(row, "current_balance")?,
        daily_allowance: decimal(row, "daily_allowance")?,
        last_processed_date: day_key(row, "last_processed_date")?,
    })
}

fn entry_from_row(row: &SqliteRow) -> Result<(DayKey, LedgerEntry)> {
    let entry_type: String = row.try_get("entry_type")?;
    let timestamp: String = row.try_get("timestamp")?;
    let entry = LedgerEntry {
        id: EntryId::new(row.try_get::<String, _>("id")?),
        entry_type: EntryType::from_str(&entry_type)?,
        amount: decimal(row, "amount")?,
        note: row.try_get("note")?,
        timestamp: chrono::DateTime::parse_from_rfc3339(&timestamp)?,
    };
    Ok((day_key(row, "day")?, entry))
}

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn read_all(&self) -> Result<LedgerSnapshot> {
        let mut snapshot = LedgerSnapshot::default();

        let account_row = sqlx::query(
            "SELECT current_balance, daily_allowance, last_processed_date FROM account WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        snapshot.account = account_row.as_ref().map(account_from_row).transpose()?;

        let entry_rows = sqlx::query("SELECT id, day, entry_type, amount, note, timestamp FROM entries")
            .fetch_all(&self.pool)
            .await?;
        for row in &entry_rows {
            let (day, entry) = entry_from_row(row)?;
            snapshot.ledger.entry(day).or_default().insert(entry.id.clone(), entry);
        }

        let balance_rows = sqlx::query("SELECT day, balance FROM closing_balances")
            .fetch_all(&self.pool)
            .await?;
        for row in &balance_rows {
            snapshot
                .closing_balances
                .insert(day_key(row, "day")?, decimal(row, "balance")?);
        }

        Ok(snapshot)
    }

    async fn write_fields(&self, patch: AccountPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;

        if patch.touches_account() {
            let row = sqlx::query(
                "SELECT current_balance, daily_allowance, last_processed_date FROM account WHERE id = 1",
            )
            .fetch_optional(&mut *tx)
            .await?;
            let mut scratch = LedgerSnapshot {
                account: row.as_ref().map(account_from_row).transpose()?,
                ..Default::default()
            };
            let account_only = AccountPatch {
                closing_balances: Default::default(),
                ..patch.clone()
            };
            account_only.apply_to(&mut scratch)?;
            let account = scratch
                .account
                .ok_or_else(|| anyhow!("Account missing after applying patch"))?;

            sqlx::query(
                r#"
                INSERT INTO account (id, current_balance, daily_allowance, last_processed_date)
                VALUES (1, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    current_balance = excluded.current_balance,
                    daily_allowance = excluded.daily_allowance,
                    last_processed_date = excluded.last_processed_date
                "#,
            )
            .bind(account.current_balance.to_string())
            .bind(account.daily_allowance.to_string())
            .bind(account.last_processed_date.to_string())
            .execute(&mut *tx)
            .await?;
        }

        for (day, value) in &patch.closing_balances {
            match value {
                Some(balance) => {
                    sqlx::query(
                        r#"
                        INSERT INTO closing_balances (day, balance) VALUES (?, ?)
                        ON CONFLICT(day) DO UPDATE SET balance = excluded.balance
                        "#,
                    )
                    .bind(day.to_string())
                    .bind(balance.to_string())
                    .execute(&mut *tx)
                    .await?;
                }
                None => {
                    sqlx::query("DELETE FROM closing_balances WHERE day = ?")
                        .bind(day.to_string())
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        debug!("Committed field patch touching {} closing balances", patch.closing_balances.len());
        self.notify_listeners().await
    }

    async fn append_entry(&self, day: &DayKey, entry: NewLedgerEntry) -> Result<EntryId> {
        let id = EntryId::generate();
        sqlx::query(
            r#"
            INSERT INTO entries (id, day, entry_type, amount, note, timestamp)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(day.as_str())
        .bind(entry.entry_type.as_str())
        .bind(entry.amount.to_string())
        .bind(entry.note.as_deref())
        .bind(entry.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await?;
        debug!("Appended entry {} to {}", id, day);

        self.notify_listeners().await?;
        Ok(id)
    }

    async fn remove_entry(&self, day: &DayKey, id: &EntryId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM entries WHERE id = ? AND day = ?")
            .bind(id.as_str())
            .bind(day.as_str())
            .execute(&self.pool)
            .await?;
        let removed = result.rows_affected() > 0;
        if removed {
            debug!("Removed entry {} from {}", id, day);
            self.notify_listeners().await?;
        }
        Ok(removed)
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.subscribers.register(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn day(s: &str) -> DayKey {
        DayKey::parse(s).unwrap()
    }

    fn noon(on: &str) -> chrono::DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("{}T12:00:00+01:00", on)).unwrap()
    }

    #[tokio::test]
    async fn test_empty_database_reads_as_empty_snapshot() {
        let store = SqliteLedgerStore::in_memory().await.unwrap();
        assert_eq!(store.read_all().await.unwrap(), LedgerSnapshot::default());
    }

    #[tokio::test]
    async fn test_fields_and_entries_round_trip() {
        let store = SqliteLedgerStore::in_memory().await.unwrap();
        let account = AccountState::initial(day("2024-01-01"), dec!(2.5));
        store.write_fields(AccountPatch::from_account(&account)).await.unwrap();

        let id = store
            .append_entry(
                &day("2024-01-02"),
                NewLedgerEntry::spend(dec!(0.75), Some("Gum".to_string()), noon("2024-01-02")),
            )
            .await
            .unwrap();
        store
            .write_fields(
                AccountPatch::new()
                    .current_balance(dec!(-0.75))
                    .closing_balance(day("2024-01-02"), dec!(-0.75)),
            )
            .await
            .unwrap();

        let snapshot = store.read_all().await.unwrap();
        let stored = snapshot.account.clone().unwrap();
        assert_eq!(stored.current_balance, dec!(-0.75));
        assert_eq!(stored.daily_allowance, dec!(2.5));
        let entry = snapshot.find_entry(&day("2024-01-02"), &id).unwrap();
        assert_eq!(entry.amount, dec!(-0.75));
        assert_eq!(entry.note.as_deref(), Some("Gum"));
        assert_eq!(entry.timestamp, noon("2024-01-02"));
        assert_eq!(snapshot.closing_balances.get(&day("2024-01-02")), Some(&dec!(-0.75)));
    }

    #[tokio::test]
    async fn test_remove_entry_reports_absence() {
        let store = SqliteLedgerStore::in_memory().await.unwrap();
        let id = store
            .append_entry(&day("2024-01-02"), NewLedgerEntry::bonus(dec!(1), None, noon("2024-01-02")))
            .await
            .unwrap();
        // Wrong day does not match
        assert!(!store.remove_entry(&day("2024-01-03"), &id).await.unwrap());
        assert!(store.remove_entry(&day("2024-01-02"), &id).await.unwrap());
        assert!(!store.remove_entry(&day("2024-01-02"), &id).await.unwrap());
        assert!(store.read_all().await.unwrap().ledger.is_empty());
    }

    #[tokio::test]
    async fn test_partial_patch_without_account_rolls_back() {
        let store = SqliteLedgerStore::in_memory().await.unwrap();
        let result = store
            .write_fields(
                AccountPatch::new()
                    .current_balance(dec!(3))
                    .closing_balance(day("2024-01-02"), dec!(3)),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(store.read_all().await.unwrap(), LedgerSnapshot::default());
    }

    #[tokio::test]
    async fn test_database_file_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(DATABASE_FILE);
        {
            let store = SqliteLedgerStore::open(&path).await.unwrap();
            let account = AccountState::initial(day("2024-03-01"), dec!(4));
            store.write_fields(AccountPatch::from_account(&account)).await.unwrap();
        }
        let reopened = SqliteLedgerStore::open(&path).await.unwrap();
        let account = reopened.read_all().await.unwrap().account.unwrap();
        assert_eq!(account.last_processed_date, day("2024-03-01"));
        assert_eq!(account.daily_allowance, dec!(4));
    }
}
