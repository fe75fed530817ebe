use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of ledger entry for rendering and business logic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Daily allowance credited by the backfill engine
    Allowance,
    /// Money spent (stored as a negative amount)
    Spend,
    /// Extra money added on top of the allowance
    Bonus,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::Allowance => write!(f, "allowance"),
            EntryType::Spend => write!(f, "spend"),
            EntryType::Bonus => write!(f, "bonus"),
        }
    }
}

/// A single ledger entry as seen by the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    /// Calendar day (YYYY-MM-DD) the entry belongs to
    pub day: String,
    pub entry_type: EntryType,
    /// Signed amount (negative for spending)
    pub amount: Decimal,
    pub note: Option<String>,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountResponse {
    pub current_balance: Decimal,
    pub daily_allowance: Decimal,
    pub last_processed_date: String,
    pub today: String,
}

/// Request body for recording a spend or a bonus.
///
/// `amount` is user-entered text such as `"12.50"` or `"$5"`; it must parse
/// to a positive value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntryRequest {
    pub amount: String,
    /// Day to book the entry on (YYYY-MM-DD), defaults to today
    pub day: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEntryResponse {
    pub entry_id: String,
    pub day: String,
    pub current_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UndoEntryResponse {
    pub removed: bool,
    pub current_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetBalanceRequest {
    /// New balance; may be zero or negative
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateAllowanceRequest {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackfillResponse {
    pub days_visited: u32,
    pub entries_appended: u32,
    pub current_balance: Decimal,
    pub last_processed_date: String,
}

/// Today's allowance, credited at most once per day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueAllowanceResponse {
    /// False when today already had an allowance
    pub issued: bool,
    pub entry_id: Option<String>,
    pub current_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalculateRequest {
    /// First day to rebuild; the whole history when omitted
    pub from_day: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecalculateResponse {
    pub from_day: String,
    pub days_recalculated: usize,
    pub days_changed: usize,
    pub current_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub is_consistent: bool,
    pub errors: Vec<String>,
}

/// Entries booked on one day together with that day's closing balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayEntries {
    pub day: String,
    pub closing_balance: Decimal,
    pub entries: Vec<LedgerEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentEntriesResponse {
    pub days: Vec<DayEntries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyClosing {
    pub day: String,
    pub closing_balance: Decimal,
    /// True when the ledger has entries on this day
    pub has_activity: bool,
}

/// Closing-balance summary for a week or a month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub start: String,
    pub end: String,
    /// Closing balance of the last day before the period
    pub opening_balance: Decimal,
    pub closing_balance: Decimal,
    pub total_allowance: Decimal,
    /// Sum of spending as a positive number
    pub total_spent: Decimal,
    pub total_bonus: Decimal,
    pub days: Vec<DailyClosing>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_serializes_snake_case() {
        let json = serde_json::to_string(&EntryType::Allowance).unwrap();
        assert_eq!(json, "\"allowance\"");
        let parsed: EntryType = serde_json::from_str("\"spend\"").unwrap();
        assert_eq!(parsed, EntryType::Spend);
    }

    #[test]
    fn test_record_entry_request_optional_fields() {
        let request: RecordEntryRequest = serde_json::from_str(r#"{"amount": "4.50"}"#).unwrap();
        assert_eq!(request.amount, "4.50");
        assert!(request.day.is_none());
        assert!(request.note.is_none());
    }
}
