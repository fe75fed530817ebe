use crate::backend::domain::commands::ledger::{RecordEntryResult, UndoEntryResult};
use crate::backend::domain::commands::summary::DayEntriesView;
use crate::backend::domain::day_key::DayKey;
use crate::backend::domain::models::{EntryType as DomainEntryType, LedgerEntry as DomainLedgerEntry};
use rust_decimal::Decimal;
use shared::{
    DayEntries, EntryType as SharedEntryType, IssueAllowanceResponse, LedgerEntry as SharedLedgerEntry,
    RecordEntryResponse, UndoEntryResponse,
};

pub struct EntryMapper;

impl EntryMapper {
    pub fn to_dto(day: &DayKey, domain: DomainLedgerEntry) -> SharedLedgerEntry {
        SharedLedgerEntry {
            id: domain.id.to_string(),
            day: day.to_string(),
            entry_type: Self::to_dto_type(domain.entry_type),
            amount: domain.amount,
            note: domain.note,
            timestamp: domain.timestamp.to_rfc3339(),
        }
    }

    fn to_dto_type(domain_type: DomainEntryType) -> SharedEntryType {
        match domain_type {
            DomainEntryType::Allowance => SharedEntryType::Allowance,
            DomainEntryType::Spend => SharedEntryType::Spend,
            DomainEntryType::Bonus => SharedEntryType::Bonus,
        }
    }

    pub fn to_day_entries(view: DayEntriesView) -> DayEntries {
        let entries = view
            .entries
            .into_iter()
            .map(|entry| Self::to_dto(&view.day, entry))
            .collect();
        DayEntries {
            day: view.day.to_string(),
            closing_balance: view.closing_balance,
            entries,
        }
    }

    pub fn to_record_response(result: RecordEntryResult) -> RecordEntryResponse {
        RecordEntryResponse {
            entry_id: result.entry_id.to_string(),
            day: result.day.to_string(),
            current_balance: result.current_balance,
        }
    }

    pub fn to_undo_response(result: UndoEntryResult) -> UndoEntryResponse {
        UndoEntryResponse {
            removed: result.removed,
            current_balance: result.current_balance,
        }
    }

    /// `balance` is reported when nothing was issued
    pub fn to_issue_response(result: Option<RecordEntryResult>, balance: Decimal) -> IssueAllowanceResponse {
        match result {
            Some(result) => IssueAllowanceResponse {
                issued: true,
                entry_id: Some(result.entry_id.to_string()),
                current_balance: result.current_balance,
            },
            None => IssueAllowanceResponse {
                issued: false,
                entry_id: None,
                current_balance: balance,
            },
        }
    }
}
