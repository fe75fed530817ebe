//! # In-Memory Ledger Store
//!
//! Keeps the whole ledger tree in a mutex-guarded [`LedgerSnapshot`]. Used by
//! tests and by `storage: memory` runs where nothing needs to survive a
//! restart.
//!
//! A write budget can be set to make the store start failing after a number
//! of successful writes, which is how tests simulate a process dying half
//! way through a backfill.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use std::sync::{Arc, Mutex};

use super::subscription::{SubscriberRegistry, Subscription};
use super::traits::{ChangeListener, LedgerStore};
use crate::backend::domain::day_key::DayKey;
use crate::backend::domain::models::{AccountPatch, EntryId, LedgerSnapshot, NewLedgerEntry};

#[derive(Default)]
struct MemoryState {
    snapshot: LedgerSnapshot,
    /// Remaining successful writes; `None` means unlimited
    write_budget: Option<usize>,
}

#[derive(Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<MemoryState>>,
    subscribers: SubscriberRegistry,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot
    pub fn with_snapshot(snapshot: LedgerSnapshot) -> Self {
        let store = Self::new();
        if let Ok(mut state) = store.state.lock() {
            state.snapshot = snapshot;
        }
        store
    }

    /// Allow only `writes` more successful writes, then fail every write.
    /// `None` lifts the limit.
    pub fn set_write_budget(&self, writes: Option<usize>) {
        if let Ok(mut state) = self.state.lock() {
            state.write_budget = writes;
        }
    }

    /// Run `change` against the snapshot under the lock, then notify
    /// listeners with the committed result.
    fn commit<T>(&self, change: impl FnOnce(&mut LedgerSnapshot) -> Result<T>) -> Result<T> {
        let (result, snapshot) = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| anyhow!("In-memory ledger state is poisoned"))?;
            match state.write_budget {
                Some(0) => return Err(anyhow!("In-memory ledger store rejected the write (budget exhausted)")),
                Some(remaining) => state.write_budget = Some(remaining - 1),
                None => {}
            }
            let result = change(&mut state.snapshot)?;
            (result, state.snapshot.clone())
        };
        self.subscribers.notify(&snapshot);
        Ok(result)
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn read_all(&self) -> Result<LedgerSnapshot> {
        let state = self
            .state
            .lock()
            .map_err(|_| anyhow!("In-memory ledger state is poisoned"))?;
        Ok(state.snapshot.clone())
    }

    async fn write_fields(&self, patch: AccountPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        self.commit(|snapshot| patch.apply_to(snapshot))
    }

    async fn append_entry(&self, day: &DayKey, entry: NewLedgerEntry) -> Result<EntryId> {
        self.commit(|snapshot| {
            let id = EntryId::generate();
            debug!("Appending {} entry {} to {}", entry.entry_type, id, day);
            snapshot
                .ledger
                .entry(day.clone())
                .or_default()
                .insert(id.clone(), entry.with_id(id.clone()));
            Ok(id)
        })
    }

    async fn remove_entry(&self, day: &DayKey, id: &EntryId) -> Result<bool> {
        let exists = self.read_all().await?.find_entry(day, id).is_some();
        if !exists {
            return Ok(false);
        }
        self.commit(|snapshot| {
            let Some(bucket) = snapshot.ledger.get_mut(day) else {
                return Ok(false);
            };
            let removed = bucket.remove(id).is_some();
            if bucket.is_empty() {
                snapshot.ledger.remove(day);
            }
            Ok(removed)
        })
    }

    fn subscribe(&self, listener: ChangeListener) -> Subscription {
        self.subscribers.register(listener)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::AccountState;
    use chrono::DateTime;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn day(s: &str) -> DayKey {
        DayKey::parse(s).unwrap()
    }

    fn noon() -> chrono::DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339("2024-01-05T12:00:00+00:00").unwrap()
    }

    #[tokio::test]
    async fn test_append_and_remove_entry() {
        let store = InMemoryLedgerStore::new();
        let id = store
            .append_entry(&day("2024-01-05"), NewLedgerEntry::spend(dec!(3), None, noon()))
            .await
            .unwrap();

        let snapshot = store.read_all().await.unwrap();
        assert_eq!(snapshot.find_entry(&day("2024-01-05"), &id).unwrap().amount, dec!(-3));

        assert!(store.remove_entry(&day("2024-01-05"), &id).await.unwrap());
        assert!(!store.remove_entry(&day("2024-01-05"), &id).await.unwrap());
        // Empty buckets disappear
        assert!(store.read_all().await.unwrap().ledger.is_empty());
    }

    #[tokio::test]
    async fn test_listeners_see_each_commit() {
        let store = InMemoryLedgerStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let _subscription = store.subscribe(Arc::new(move |_snapshot: &LedgerSnapshot| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let account = AccountState::initial(day("2024-01-01"), dec!(10));
        store.write_fields(AccountPatch::from_account(&account)).await.unwrap();
        store
            .append_entry(&day("2024-01-01"), NewLedgerEntry::bonus(dec!(1), None, noon()))
            .await
            .unwrap();
        // Empty patches are not commits
        store.write_fields(AccountPatch::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_write_budget_simulates_outage() {
        let store = InMemoryLedgerStore::new();
        store.set_write_budget(Some(1));
        let account = AccountState::initial(day("2024-01-01"), dec!(10));
        store.write_fields(AccountPatch::from_account(&account)).await.unwrap();
        assert!(store
            .write_fields(AccountPatch::new().current_balance(dec!(5)))
            .await
            .is_err());
        // Reads keep working and the failed write left no trace
        let snapshot = store.read_all().await.unwrap();
        assert_eq!(snapshot.account.unwrap().current_balance, dec!(0));

        store.set_write_budget(None);
        store
            .write_fields(AccountPatch::new().current_balance(dec!(5)))
            .await
            .unwrap();
    }
}
