//! # Storage Module
//!
//! Persistence for the ledger tree. The domain layer only sees the
//! [`LedgerStore`] trait; three backends implement it:
//!
//! - **csv** - YAML account file plus CSV entries and closing balances in a
//!   data directory, optionally versioned with git (the default)
//! - **sqlite** - single database file through SQLx
//! - **memory** - process-local, used by tests and throwaway runs
//!
//! Every backend applies each call atomically and notifies registered change
//! listeners with a fresh snapshot after a committed change.

pub mod csv;
pub mod git;
pub mod memory;
pub mod sqlite;
pub mod subscription;
pub mod traits;

pub use csv::{CsvConnection, CsvLedgerStore};
pub use git::GitManager;
pub use memory::InMemoryLedgerStore;
pub use sqlite::SqliteLedgerStore;
pub use subscription::{SubscriberRegistry, Subscription};
pub use traits::{ChangeListener, LedgerStore};
