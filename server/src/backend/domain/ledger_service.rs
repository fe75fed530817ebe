//! Ledger mutation entry points.
//!
//! Every mutation that touches the ledger is followed by a recalculation
//! from the affected day. The recalculation is a full re-derivation, so
//! concurrent callers need no lock here: whichever recalculation runs last
//! sees every committed entry.

use log::{debug, info};
use rust_decimal::Decimal;
use std::sync::Arc;

use super::account_service::AccountService;
use super::balance_service::BalanceService;
use super::clock::Clock;
use super::commands::ledger::{RecordEntryCommand, RecordEntryResult, UndoEntryResult};
use super::day_key::DayKey;
use super::error::{LedgerError, LedgerResult};
use super::models::{AccountPatch, AccountState, EntryId, EntryType, NewLedgerEntry};
use super::money_management::MoneyManagementService;
use crate::backend::storage::LedgerStore;

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    accounts: AccountService,
    balances: BalanceService,
    money: MoneyManagementService,
}

impl LedgerService {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        clock: Arc<dyn Clock>,
        accounts: AccountService,
        balances: BalanceService,
    ) -> Self {
        Self {
            store,
            clock,
            accounts,
            balances,
            money: MoneyManagementService::new(),
        }
    }

    /// Record money spent; booked as a negative entry
    pub async fn record_spend(&self, command: RecordEntryCommand) -> LedgerResult<RecordEntryResult> {
        self.record(EntryType::Spend, command).await
    }

    /// Record extra money received
    pub async fn record_bonus(&self, command: RecordEntryCommand) -> LedgerResult<RecordEntryResult> {
        self.record(EntryType::Bonus, command).await
    }

    async fn record(&self, entry_type: EntryType, command: RecordEntryCommand) -> LedgerResult<RecordEntryResult> {
        // Validate before anything is written, including lazy account init
        let amount = self.money.ensure_positive(command.amount)?;
        let note = self.money.validate_note(command.note)?;
        let day = command.day.unwrap_or_else(|| self.clock.today());
        let timestamp = self.clock.now();

        let entry = match entry_type {
            EntryType::Spend => NewLedgerEntry::spend(amount, note, timestamp),
            EntryType::Bonus => NewLedgerEntry::bonus(amount, note, timestamp),
            EntryType::Allowance => NewLedgerEntry::allowance(amount, timestamp),
        };

        self.accounts.load().await?;
        let entry_id = self
            .store
            .append_entry(&day, entry)
            .await
            .map_err(LedgerError::store)?;
        info!("Recorded {} {} of ${:.2} on {}", entry_type, entry_id, amount, day);

        let report = self.balances.recalculate_from(&day).await?;
        Ok(RecordEntryResult {
            entry_id,
            day,
            current_balance: report.current_balance,
        })
    }

    /// Remove an entry. Removing an entry that is not there succeeds and
    /// changes nothing.
    pub async fn undo_entry(&self, day: &DayKey, entry_id: &EntryId) -> LedgerResult<UndoEntryResult> {
        let (account, snapshot) = self.accounts.load_account().await?;
        let Some(bucket) = snapshot.ledger.get(day).filter(|bucket| bucket.contains_key(entry_id)) else {
            debug!("Entry {} not found on {}, nothing to undo", entry_id, day);
            return Ok(UndoEntryResult {
                removed: false,
                current_balance: account.current_balance,
            });
        };
        let empties_day = bucket.len() == 1;

        let removed = self
            .store
            .remove_entry(day, entry_id)
            .await
            .map_err(LedgerError::store)?;
        if !removed {
            // Another session removed it between our read and the remove
            debug!("Entry {} on {} was already removed", entry_id, day);
            return Ok(UndoEntryResult {
                removed: false,
                current_balance: account.current_balance,
            });
        }
        info!("Removed entry {} from {}", entry_id, day);

        // A day without entries has no closing balance of its own
        if empties_day {
            self.store
                .write_fields(AccountPatch::new().remove_closing_balance(day.clone()))
                .await
                .map_err(LedgerError::store)?;
        }

        let report = self.balances.recalculate_from(day).await?;
        Ok(UndoEntryResult {
            removed: true,
            current_balance: report.current_balance,
        })
    }

    /// Override the current balance without booking an entry.
    ///
    /// Closing balances are left as they are, so the override only lasts
    /// until the next recalculation re-derives the balance from the ledger.
    pub async fn set_current_balance(&self, value: Decimal) -> LedgerResult<AccountState> {
        let mut account = self.accounts.account().await?;
        info!("Setting current balance from ${:.2} to ${:.2}", account.current_balance, value);
        self.store
            .write_fields(AccountPatch::new().current_balance(value))
            .await
            .map_err(LedgerError::store)?;
        account.current_balance = value;
        Ok(account)
    }

    /// Change the allowance used by future backfill runs
    pub async fn update_daily_allowance(&self, value: Decimal) -> LedgerResult<AccountState> {
        let value = self.money.ensure_positive(value)?;
        let mut account = self.accounts.account().await?;
        info!("Updating daily allowance from ${:.2} to ${:.2}", account.daily_allowance, value);
        self.store
            .write_fields(AccountPatch::new().daily_allowance(value))
            .await
            .map_err(LedgerError::store)?;
        account.daily_allowance = value;
        Ok(account)
    }
}
