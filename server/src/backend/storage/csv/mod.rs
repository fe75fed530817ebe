//! # CSV Storage Module
//!
//! File-based ledger store. Account fields are kept in YAML, entries and the
//! closing-balance index in CSV, all inside one data directory.
//!
//! ## File Format
//!
//! ```csv
//! id,day,type,amount,note,timestamp
//! 5f0c...,2024-01-02,allowance,100,,2024-01-02T00:00:00-05:00
//! 9a1e...,2024-01-02,spend,-12.50,Comic book,2024-01-02T16:10:03-05:00
//! ```
//!
//! ```csv
//! day,balance
//! 2024-01-02,87.50
//! ```

pub mod account_repository;
pub mod closing_balance_repository;
pub mod connection;
pub mod entry_repository;
pub mod ledger_store;

#[cfg(test)]
pub mod test_utils;

pub use account_repository::AccountRepository;
pub use closing_balance_repository::ClosingBalanceRepository;
pub use connection::CsvConnection;
pub use entry_repository::EntryRepository;
pub use ledger_store::CsvLedgerStore;
