//! Money input handling for the allowance ledger.
//!
//! Amounts arrive from the presentation layer as user-entered text. This
//! module turns that text into exact decimals and enforces the input rules
//! shared by every mutation: positive amounts for spends, bonuses and the
//! daily allowance, at most two decimal places, and bounded notes.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::error::{LedgerError, LedgerResult};
use super::models::MAX_NOTE_LENGTH;

/// Input rules for money fields
#[derive(Debug, Clone)]
pub struct MoneyConfig {
    pub currency_symbol: String,
    pub max_amount: Decimal,
    pub max_decimal_places: u32,
}

impl Default for MoneyConfig {
    fn default() -> Self {
        Self {
            currency_symbol: "$".to_string(),
            max_amount: Decimal::from(1_000_000),
            max_decimal_places: 2,
        }
    }
}

/// Parses and validates money input
#[derive(Debug, Clone, Default)]
pub struct MoneyManagementService {
    config: MoneyConfig,
}

impl MoneyManagementService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a strictly positive amount such as `"12.50"`, `"$5"` or `"1,200"`
    pub fn parse_amount(&self, input: &str) -> LedgerResult<Decimal> {
        let amount = self.clean_and_parse(input)?;
        self.ensure_positive(amount)
    }

    /// Parse a balance override; zero and negative values are allowed
    pub fn parse_balance(&self, input: &str) -> LedgerResult<Decimal> {
        let amount = self.clean_and_parse(input)?;
        if amount.abs() > self.config.max_amount || amount.scale() > self.config.max_decimal_places {
            return Err(LedgerError::InvalidAmount(input.to_string()));
        }
        Ok(amount)
    }

    /// Reject zero, negative, oversized or over-precise amounts
    pub fn ensure_positive(&self, amount: Decimal) -> LedgerResult<Decimal> {
        let normalized = amount.normalize();
        if normalized <= Decimal::ZERO
            || normalized > self.config.max_amount
            || normalized.scale() > self.config.max_decimal_places
        {
            return Err(LedgerError::invalid_amount(amount));
        }
        Ok(amount)
    }

    /// Trim a note; blank notes become `None`
    pub fn validate_note(&self, note: Option<String>) -> LedgerResult<Option<String>> {
        match note.map(|n| n.trim().to_string()) {
            Some(n) if n.is_empty() => Ok(None),
            Some(n) if n.chars().count() > MAX_NOTE_LENGTH => Err(LedgerError::InvalidNote(n.chars().count())),
            other => Ok(other),
        }
    }

    fn clean_and_parse(&self, input: &str) -> LedgerResult<Decimal> {
        // Remove currency symbol, thousands separators and spaces
        let cleaned = input
            .trim()
            .replace(&self.config.currency_symbol, "")
            .replace(',', "")
            .replace(' ', "");

        if cleaned.is_empty() {
            return Err(LedgerError::InvalidAmount(input.to_string()));
        }

        Decimal::from_str(&cleaned)
            .map(|d| d.normalize())
            .map_err(|_| LedgerError::InvalidAmount(input.to_string()))
    }
}
