//! Account state, the persisted ledger snapshot, and partial field updates.
use anyhow::{anyhow, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::entry::{EntryId, EntryType, LedgerEntry};
use crate::backend::domain::day_key::DayKey;

/// The singleton account record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub current_balance: Decimal,
    pub daily_allowance: Decimal,
    /// Watermark up to which allowance backfill has run
    pub last_processed_date: DayKey,
}

impl AccountState {
    /// State written on first access
    pub fn initial(today: DayKey, daily_allowance: Decimal) -> Self {
        Self {
            current_balance: Decimal::ZERO,
            daily_allowance,
            last_processed_date: today,
        }
    }
}

/// Everything the store holds, as returned by `read_all`.
///
/// `account` is `None` until the account has been initialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub account: Option<AccountState>,
    pub ledger: BTreeMap<DayKey, BTreeMap<EntryId, LedgerEntry>>,
    pub closing_balances: BTreeMap<DayKey, Decimal>,
}

impl LedgerSnapshot {
    pub fn entries_on(&self, day: &DayKey) -> impl Iterator<Item = &LedgerEntry> {
        self.ledger.get(day).into_iter().flat_map(|bucket| bucket.values())
    }

    /// Entries of a day ordered by timestamp, ties broken by id
    pub fn sorted_entries_on(&self, day: &DayKey) -> Vec<LedgerEntry> {
        let mut entries: Vec<LedgerEntry> = self.entries_on(day).cloned().collect();
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        entries
    }

    /// Net change of the balance on `day`
    pub fn day_total(&self, day: &DayKey) -> Decimal {
        self.entries_on(day).map(|entry| entry.amount).sum()
    }

    pub fn has_allowance_on(&self, day: &DayKey) -> bool {
        self.entries_on(day)
            .any(|entry| entry.entry_type == EntryType::Allowance)
    }

    pub fn has_entries_on(&self, day: &DayKey) -> bool {
        self.ledger.get(day).map_or(false, |bucket| !bucket.is_empty())
    }

    /// Latest indexed closing balance strictly before `day`
    pub fn closing_before(&self, day: &DayKey) -> Option<(&DayKey, Decimal)> {
        self.closing_balances
            .range(..day.clone())
            .next_back()
            .map(|(key, balance)| (key, *balance))
    }

    /// Closing balance at the end of `day`, carried forward from the last
    /// indexed day at or before it
    pub fn closing_at(&self, day: &DayKey) -> Decimal {
        self.closing_balances
            .range(..=day.clone())
            .next_back()
            .map(|(_, balance)| *balance)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn find_entry(&self, day: &DayKey, id: &EntryId) -> Option<&LedgerEntry> {
        self.ledger.get(day).and_then(|bucket| bucket.get(id))
    }
}

/// A set of field writes applied by the store as one call.
///
/// A closing balance of `None` removes that day from the index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccountPatch {
    pub current_balance: Option<Decimal>,
    pub daily_allowance: Option<Decimal>,
    pub last_processed_date: Option<DayKey>,
    pub closing_balances: BTreeMap<DayKey, Option<Decimal>>,
}

impl AccountPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch carrying a complete account record
    pub fn from_account(account: &AccountState) -> Self {
        Self {
            current_balance: Some(account.current_balance),
            daily_allowance: Some(account.daily_allowance),
            last_processed_date: Some(account.last_processed_date.clone()),
            closing_balances: BTreeMap::new(),
        }
    }

    pub fn current_balance(mut self, value: Decimal) -> Self {
        self.current_balance = Some(value);
        self
    }

    pub fn daily_allowance(mut self, value: Decimal) -> Self {
        self.daily_allowance = Some(value);
        self
    }

    pub fn last_processed_date(mut self, day: DayKey) -> Self {
        self.last_processed_date = Some(day);
        self
    }

    pub fn closing_balance(mut self, day: DayKey, value: Decimal) -> Self {
        self.closing_balances.insert(day, Some(value));
        self
    }

    pub fn remove_closing_balance(mut self, day: DayKey) -> Self {
        self.closing_balances.insert(day, None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.current_balance.is_none()
            && self.daily_allowance.is_none()
            && self.last_processed_date.is_none()
            && self.closing_balances.is_empty()
    }

    pub fn touches_account(&self) -> bool {
        self.current_balance.is_some()
            || self.daily_allowance.is_some()
            || self.last_processed_date.is_some()
    }

    /// Apply the patch to a snapshot held by a store.
    ///
    /// Creating the account requires all three account fields.
    pub fn apply_to(&self, snapshot: &mut LedgerSnapshot) -> Result<()> {
        if self.touches_account() {
            let account = match snapshot.account.take() {
                Some(mut account) => {
                    if let Some(value) = self.current_balance {
                        account.current_balance = value;
                    }
                    if let Some(value) = self.daily_allowance {
                        account.daily_allowance = value;
                    }
                    if let Some(day) = &self.last_processed_date {
                        account.last_processed_date = day.clone();
                    }
                    account
                }
                None => match (self.current_balance, self.daily_allowance, &self.last_processed_date) {
                    (Some(current_balance), Some(daily_allowance), Some(day)) => AccountState {
                        current_balance,
                        daily_allowance,
                        last_processed_date: day.clone(),
                    },
                    _ => return Err(anyhow!("Account is not initialized; a full account record is required")),
                },
            };
            snapshot.account = Some(account);
        }

        for (day, value) in &self.closing_balances {
            match value {
                Some(balance) => {
                    snapshot.closing_balances.insert(day.clone(), *balance);
                }
                None => {
                    snapshot.closing_balances.remove(day);
                }
            }
        }
        Ok(())
    }
}
