//! Domain models for the allowance ledger.

pub mod account;
pub mod entry;

pub use account::*;
pub use entry::*;
