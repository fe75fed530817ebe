//! # SQLite Storage Module
//!
//! Single-file database alternative to the CSV store, selected with
//! `storage: sqlite` in the configuration. Tables:
//!
//! - **account** - one row (`id = 1`) with the account fields
//! - **entries** - every ledger entry, indexed by day
//! - **closing_balances** - the closing-balance index
//!
//! Decimals are stored as TEXT.

pub mod ledger_store;

pub use ledger_store::{SqliteLedgerStore, DATABASE_FILE};
