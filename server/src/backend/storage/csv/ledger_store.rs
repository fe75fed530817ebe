//! # CSV Ledger Store
//!
//! File-backed [`LedgerStore`]. The data directory holds three files:
//!
//! ```text
//! <data_directory>/
//! ├── account.yaml           ← account fields
//! ├── entries.csv            ← every ledger entry
//! └── closing_balances.csv   ← closing-balance index
//! ```
//!
//! Each store call rewrites the files it touches through temp files, under a
//! single async mutex, so calls are atomic with respect to each other within
//! one process. Optionally every change is committed to a git repository in
//! the data directory.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::account_repository::AccountRepository;
use super::closing_balance_repository::ClosingBalanceRepository;
use super::connection::{CsvConnection, ACCOUNT_FILE, CLOSING_BALANCES_FILE, ENTRIES_FILE};
use super::entry_repository::EntryRepository;
use crate::backend::domain::day_key::DayKey;
use crate::backend::domain::models::{AccountPatch, EntryId, LedgerSnapshot, NewLedgerEntry};
use crate::backend::storage::git::GitManager;
use crate::backend::storage::subscription::{SubscriberRegistry, Subscription};
use crate::backend::storage::traits::{ChangeListener, LedgerStore};

#[derive(Clone)]
pub struct CsvLedgerStore {
    connection: CsvConnection,
    accounts: AccountRepository,
    entries: EntryRepository,
    closing_balances: ClosingBalanceRepository,
    git_manager: Option<GitManager>,
    write_lock: Arc<Mutex<()>>,
    subscribers: SubscriberRegistry,
}

impl CsvLedgerStore {
    pub fn new(connection: CsvConnection) -> Self {
        Self {
            accounts: AccountRepository::new(connection.clone()),
            entries: EntryRepository::new(connection.clone()),
            closing_balances: ClosingBalanceRepository::new(connection.clone()),
            connection,
            git_manager: None,
            write_lock: Arc::new(Mutex::new(())),
            subscribers: SubscriberRegistry::new(),
        }
    }

    /// Commit the ledger files to a git repository after every change
    pub fn with_git_versioning(mut self, git_manager: GitManager) -> Self {
        info!("Git versioning enabled for {}", self.connection.data_directory().display());
        self.git_manager = Some(git_manager);
        self
    }

    fn read_snapshot(&self) -> Result<LedgerSnapshot> {
        Ok(LedgerSnapshot {
            account: self.accounts.load()?,
            ledger: self.entries.read_ledger()?,
            closing_balances: self.closing_balances.read_index()?,
        })
    }

    /// Version the change and tell listeners about it
    async fn after_commit(&self, files: &[&str], description: &str) -> Result<()> {
        if let Some(git_manager) = &self.git_manager {
            git_manager
                .commit_ledger_change(self.connection.data_directory(), files, description)
                .await;
        }
        if self.subscribers.listener_count() > 0 {
            let snapshot = self.read_snapshot()?;
            self.subscribers.notify(&snapshot);
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for CsvLedgerStore {
    async fn read_all(&self) -> Result<LedgerSnapshot> {
        let _guard = self.write_lock.lock().await;
        self.read_snapshot()
    }

    async fn write_fields(&self, patch: AccountPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;

        let mut snapshot = LedgerSnapshot {
            account: self.accounts.load()?,
            ledger: Default::default(),
            closing_balances: self.closing_balances.read_index()?,
        };
        patch.apply_to(&mut snapshot)?;

        let mut files = Vec::new();
        if patch.touches_account() {
            let account = snapshot
                .account
                .as_ref()
                .ok_or_else(|| anyhow!("Account missing after applying patch"))?;
            self.accounts.save(account)?;
            files.push(ACCOUNT_FILE);
        }
        if !patch.closing_balances.is_empty() {
            self.closing_balances.write_index(&snapshot.closing_balances)?;
            files.push(CLOSING_BALANCES_FILE);
        }
        debug!("Wrote fields to {:?}", files);

        let description = match (&patch.current_balance, patch.closing_balances.len()) {
            (Some(balance), 0) => format!("balance ${:.2}", balance),
            (Some(balance), days) => format!("balance ${:.2}, {} closing balances", balance, days),
            (None, days) => format!("{} closing balances", days),
        };
        self.after_commit(&files, &description).await
    }

    async fn append_entry(&self, day: &DayKey, entry: NewLedgerEntry) -> Result<EntryId> {
        let _guard = self.write_lock.lock().await;

        let mut ledger = self.entries.read_ledger()?;
        let id = EntryId::generate();
        let description = format!("{} ${:.2} on {}", entry.entry_type, entry.amount, day);
        ledger
            .entry(day.clone())
            .or_default()
            .insert(id.clone(), entry.with_id(id.clone()));
        self.entries.write_ledger(&ledger)?;
        debug!("Appended entry {} to {}", id, day);

        self.after_commit(&[ENTRIES_FILE], &description).await?;
        Ok(id)
    }

    async fn remove_entry(&self, day: &DayKey, id: &EntryId) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut ledger = self.entries.read_ledger()?;
        let Some(bucket) = ledger.get_mut(day) else {
            return Ok(false);
        };
        if bucket.remove(id).is_none() {
            return Ok(false);
        }
        if bucket.is_empty() {
            ledger.remove(day);
        }
        self.entries.write_ledger(&ledger)?;
        debug!("Removed entry {} from {}", id, day);

        self.after_commit(&[ENTRIES_FILE], &format!("removed entry {} on {}", id, day))
            .await?;
        Ok(true)
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.subscribers.register(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::AccountState;
    use crate::backend::storage::csv::test_utils::TestEnvironment;
    use chrono::DateTime;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn day(s: &str) -> DayKey {
        DayKey::parse(s).unwrap()
    }

    fn noon(on: &str) -> chrono::DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339(&format!("{}T12:00:00-05:00", on)).unwrap()
    }

    #[tokio::test]
    async fn test_empty_directory_reads_as_empty_snapshot() {
        let env = TestEnvironment::new().unwrap();
        let store = env.store();
        assert_eq!(store.read_all().await.unwrap(), LedgerSnapshot::default());
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let env = TestEnvironment::new().unwrap();
        let store = env.store();

        let account = AccountState::initial(day("2024-01-01"), dec!(100));
        store.write_fields(AccountPatch::from_account(&account)).await.unwrap();
        let id = store
            .append_entry(&day("2024-01-02"), NewLedgerEntry::allowance(dec!(100), noon("2024-01-02")))
            .await
            .unwrap();
        store
            .write_fields(
                AccountPatch::new()
                    .current_balance(dec!(100))
                    .closing_balance(day("2024-01-02"), dec!(100)),
            )
            .await
            .unwrap();

        let reopened = CsvLedgerStore::new(CsvConnection::new(env.base_directory()).unwrap());
        let snapshot = reopened.read_all().await.unwrap();
        assert_eq!(snapshot.account.as_ref().unwrap().current_balance, dec!(100));
        assert_eq!(snapshot.find_entry(&day("2024-01-02"), &id).unwrap().amount, dec!(100));
        assert_eq!(snapshot.closing_balances.get(&day("2024-01-02")), Some(&dec!(100)));
    }

    #[tokio::test]
    async fn test_unreadable_entries_file_is_left_untouched() {
        let env = TestEnvironment::new().unwrap();
        let store = env.store();
        let contents = "id,day,type,amount,note,timestamp\n\
                        keep,2024-01-03,bonus,5.0.0,,2024-01-03T10:00:00+00:00\n";
        std::fs::write(env.connection.entries_file_path(), contents).unwrap();

        let appended = store
            .append_entry(&day("2024-01-04"), NewLedgerEntry::bonus(dec!(2), None, noon("2024-01-04")))
            .await;
        assert!(appended.is_err());
        assert!(store.remove_entry(&day("2024-01-03"), &EntryId::new("keep")).await.is_err());
        assert!(store.read_all().await.is_err());

        let after = std::fs::read_to_string(env.connection.entries_file_path()).unwrap();
        assert_eq!(after, contents);
    }

    #[tokio::test]
    async fn test_remove_entry_and_closing_balance() {
        let env = TestEnvironment::new().unwrap();
        let store = env.store();
        let id = store
            .append_entry(&day("2024-01-05"), NewLedgerEntry::spend(dec!(3), None, noon("2024-01-05")))
            .await
            .unwrap();
        store
            .write_fields(AccountPatch::new().closing_balance(day("2024-01-05"), dec!(-3)))
            .await
            .unwrap();

        assert!(store.remove_entry(&day("2024-01-05"), &id).await.unwrap());
        assert!(!store.remove_entry(&day("2024-01-05"), &id).await.unwrap());
        store
            .write_fields(AccountPatch::new().remove_closing_balance(day("2024-01-05")))
            .await
            .unwrap();

        let snapshot = store.read_all().await.unwrap();
        assert!(snapshot.ledger.is_empty());
        assert!(snapshot.closing_balances.is_empty());
    }

    #[tokio::test]
    async fn test_partial_patch_without_account_is_rejected() {
        let env = TestEnvironment::new().unwrap();
        let store = env.store();
        assert!(store
            .write_fields(AccountPatch::new().daily_allowance(dec!(3)))
            .await
            .is_err());
        assert!(!env.connection.account_file_path().exists());
    }

    #[tokio::test]
    async fn test_listeners_are_notified_until_unsubscribed() {
        let env = TestEnvironment::new().unwrap();
        let store = env.store();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let subscription = store.subscribe(Arc::new(move |snapshot: &LedgerSnapshot| {
            assert!(!snapshot.ledger.is_empty());
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        store
            .append_entry(&day("2024-01-05"), NewLedgerEntry::bonus(dec!(1), None, noon("2024-01-05")))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        store
            .append_entry(&day("2024-01-06"), NewLedgerEntry::bonus(dec!(1), None, noon("2024-01-06")))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_git_versioning_commits_changes() {
        let env = TestEnvironment::new().unwrap();
        let store = CsvLedgerStore::new(env.connection.clone()).with_git_versioning(GitManager::new());
        let account = AccountState::initial(day("2024-01-01"), dec!(100));
        store.write_fields(AccountPatch::from_account(&account)).await.unwrap();
        store
            .append_entry(&day("2024-01-01"), NewLedgerEntry::bonus(dec!(2), None, noon("2024-01-01")))
            .await
            .unwrap();

        let repo = git2::Repository::open(env.base_directory()).unwrap();
        let head = repo.head().unwrap().peel_to_commit().unwrap();
        assert!(head.message().unwrap().starts_with("Update entries.csv: bonus $2.00"));
        assert_eq!(head.parent_count(), 1);
    }
}
