//! Error type shared by the ledger services.

use rust_decimal::Decimal;

/// Errors surfaced by the domain layer.
///
/// Every variant is recoverable: validation errors abort before any write,
/// and store failures leave the ledger in a state that a later
/// recalculation can repair.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Amount must be a positive number, got '{0}'")]
    InvalidAmount(String),
    #[error("Note is too long ({0} characters, max {max})", max = crate::backend::domain::models::MAX_NOTE_LENGTH)]
    InvalidNote(usize),
    #[error("Invalid day '{0}', expected YYYY-MM-DD")]
    InvalidDayKey(String),
    #[error("Ledger store unavailable: {0:#}")]
    StoreUnavailable(#[source] anyhow::Error),
}

impl LedgerError {
    pub fn invalid_amount(amount: Decimal) -> Self {
        LedgerError::InvalidAmount(amount.to_string())
    }

    pub fn store(error: anyhow::Error) -> Self {
        LedgerError::StoreUnavailable(error)
    }

    /// True for errors caused by caller input rather than the store
    pub fn is_validation(&self) -> bool {
        !matches!(self, LedgerError::StoreUnavailable(_))
    }
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;
