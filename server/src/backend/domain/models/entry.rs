//! Domain model for a ledger entry.
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest note accepted on a spend or bonus
pub const MAX_NOTE_LENGTH: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    Allowance,
    Spend,
    Bonus,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Allowance => "allowance",
            EntryType::Spend => "spend",
            EntryType::Bonus => "bonus",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allowance" => Ok(EntryType::Allowance),
            "spend" => Ok(EntryType::Spend),
            "bonus" => Ok(EntryType::Bonus),
            other => Err(anyhow::anyhow!("Unknown entry type: {}", other)),
        }
    }
}

/// Store-assigned identifier of a ledger entry
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id, used by stores on append
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An entry as handed to the store, before it has an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub entry_type: EntryType,
    /// Signed amount: positive for allowance and bonus, negative for spend
    pub amount: Decimal,
    pub note: Option<String>,
    pub timestamp: DateTime<FixedOffset>,
}

impl NewLedgerEntry {
    pub fn allowance(amount: Decimal, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            entry_type: EntryType::Allowance,
            amount,
            note: None,
            timestamp,
        }
    }

    /// `amount` is the positive value spent; it is stored negated
    pub fn spend(amount: Decimal, note: Option<String>, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            entry_type: EntryType::Spend,
            amount: -amount,
            note,
            timestamp,
        }
    }

    pub fn bonus(amount: Decimal, note: Option<String>, timestamp: DateTime<FixedOffset>) -> Self {
        Self {
            entry_type: EntryType::Bonus,
            amount,
            note,
            timestamp,
        }
    }

    pub fn with_id(self, id: EntryId) -> LedgerEntry {
        LedgerEntry {
            id,
            entry_type: self.entry_type,
            amount: self.amount,
            note: self.note,
            timestamp: self.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub note: Option<String>,
    pub timestamp: DateTime<FixedOffset>,
}
