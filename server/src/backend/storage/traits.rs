//! # Storage Traits
//!
//! The ledger store is the only persistence seam of the application. The
//! domain layer talks to it exclusively through [`LedgerStore`], so the
//! in-memory, CSV and SQLite backends are interchangeable.
//!
//! Each call is applied atomically by the backend, but there are no
//! transactions spanning several calls. The domain services are written so
//! that any prefix of their writes can be repaired by re-running them.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::subscription::Subscription;
use crate::backend::domain::day_key::DayKey;
use crate::backend::domain::models::{AccountPatch, EntryId, LedgerSnapshot, NewLedgerEntry};

/// Callback invoked with the full snapshot after every committed change
pub type ChangeListener = Arc<dyn Fn(&LedgerSnapshot) + Send + Sync>;

/// Trait defining the interface of the durable ledger tree
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the account, every ledger bucket and the closing-balance index
    async fn read_all(&self) -> Result<LedgerSnapshot>;

    /// Apply a set of field writes in one call
    async fn write_fields(&self, patch: AccountPatch) -> Result<()>;

    /// Append an entry to a day bucket; the store assigns the id
    async fn append_entry(&self, day: &DayKey, entry: NewLedgerEntry) -> Result<EntryId>;

    /// Remove an entry from a day bucket.
    /// Returns true if the entry was found and removed, false otherwise
    async fn remove_entry(&self, day: &DayKey, id: &EntryId) -> Result<bool>;

    /// Register a change listener. Dropping the returned handle unregisters it.
    fn subscribe(&self, listener: ChangeListener) -> Subscription;
}
