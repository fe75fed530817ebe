//! # Domain Module
//!
//! Business logic of the daily allowance ledger, independent of the storage
//! backend and of the REST layer.
//!
//! ## Module Organization
//!
//! - **day_key**: calendar-day identifiers and day arithmetic
//! - **clock**: source of "now" and "today" in the account's zone
//! - **models**: account state, ledger entries, snapshots and patches
//! - **money_management**: parsing and validating user-entered amounts
//! - **account_service**: lazy account initialization
//! - **allowance_service**: backfill of allowances for elapsed days
//! - **balance_service**: closing-balance recalculation and validation
//! - **ledger_service**: spend, bonus, undo and account overrides
//! - **summary_service**: day lists and week/month summaries
//!
//! ## Core Concepts
//!
//! - **Ledger**: entries grouped by the day they are booked on
//! - **Closing balance**: the balance at the end of a day, a cache that can
//!   always be rebuilt from the ledger
//! - **Watermark**: the last day the backfill has processed
//!
//! ## Business Rules
//!
//! - Spends and bonuses must be positive amounts with at most two decimals
//! - Every elapsed day receives at most one allowance entry
//! - The watermark never moves backwards
//! - Any change to a day triggers a recalculation from that day forward

pub mod account_service;
pub mod allowance_service;
pub mod balance_service;
pub mod clock;
pub mod commands;
pub mod day_key;
pub mod error;
pub mod ledger_service;
pub mod models;
pub mod money_management;
pub mod summary_service;

pub use account_service::AccountService;
pub use allowance_service::AllowanceService;
pub use balance_service::BalanceService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use day_key::DayKey;
pub use error::{LedgerError, LedgerResult};
pub use ledger_service::LedgerService;
pub use money_management::MoneyManagementService;
pub use summary_service::SummaryService;
