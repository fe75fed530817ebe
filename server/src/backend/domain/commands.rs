//! Domain-level command and result types.
//! These structs are used by services inside the domain layer and are **not**
//! exposed over the public API. The REST layer maps the DTOs defined in the
//! `shared` crate to these internal types.

pub mod ledger {
    use crate::backend::domain::day_key::DayKey;
    use crate::backend::domain::models::EntryId;
    use rust_decimal::Decimal;

    /// Input for recording a spend or a bonus.
    #[derive(Debug, Clone)]
    pub struct RecordEntryCommand {
        /// Positive amount; the sign is applied by the entry type
        pub amount: Decimal,
        /// Day to book on, defaults to today
        pub day: Option<DayKey>,
        pub note: Option<String>,
    }

    impl RecordEntryCommand {
        pub fn today(amount: Decimal) -> Self {
            Self { amount, day: None, note: None }
        }

        pub fn on(amount: Decimal, day: DayKey) -> Self {
            Self { amount, day: Some(day), note: None }
        }

        pub fn with_note(mut self, note: impl Into<String>) -> Self {
            self.note = Some(note.into());
            self
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordEntryResult {
        pub entry_id: EntryId,
        pub day: DayKey,
        pub current_balance: Decimal,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct UndoEntryResult {
        /// False when the entry was already gone
        pub removed: bool,
        pub current_balance: Decimal,
    }
}

pub mod balance {
    use crate::backend::domain::day_key::DayKey;
    use rust_decimal::Decimal;

    /// Outcome of a recalculation run
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecalculationReport {
        pub from_day: DayKey,
        /// Days whose closing balance was re-derived
        pub days_recalculated: usize,
        /// Days whose stored value actually changed
        pub days_changed: usize,
        pub current_balance: Decimal,
    }
}

pub mod backfill {
    use crate::backend::domain::day_key::DayKey;
    use rust_decimal::Decimal;

    /// Outcome of an allowance backfill run
    #[derive(Debug, Clone, PartialEq)]
    pub struct BackfillReport {
        /// Elapsed days walked by the run
        pub days_visited: u32,
        /// Allowance entries actually appended (visited days that already
        /// had one are skipped)
        pub entries_appended: u32,
        pub current_balance: Decimal,
        pub last_processed_date: DayKey,
    }
}

pub mod summary {
    use crate::backend::domain::day_key::DayKey;
    use crate::backend::domain::models::{AccountState, LedgerEntry};
    use rust_decimal::Decimal;

    #[derive(Debug, Clone, PartialEq)]
    pub struct AccountView {
        pub account: AccountState,
        pub today: DayKey,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct DayEntriesView {
        pub day: DayKey,
        pub closing_balance: Decimal,
        /// Ordered by timestamp
        pub entries: Vec<LedgerEntry>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct DailyClosing {
        pub day: DayKey,
        pub closing_balance: Decimal,
        pub has_activity: bool,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct PeriodSummary {
        pub start: DayKey,
        pub end: DayKey,
        pub opening_balance: Decimal,
        pub closing_balance: Decimal,
        pub total_allowance: Decimal,
        pub total_spent: Decimal,
        pub total_bonus: Decimal,
        pub days: Vec<DailyClosing>,
    }
}
