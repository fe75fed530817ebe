//! Allowance backfill for days that elapsed while the app was closed.
//!
//! Every run walks forward from the account's watermark (`last_processed_date`)
//! and gives each fully elapsed day exactly one allowance entry. Today is
//! never backfilled. The walk writes each day's entry and closing balance as
//! it goes, so a run that dies half way leaves behind days that the next run
//! recognizes by their existing allowance entry and does not credit twice.

use log::{debug, info};
use rust_decimal::Decimal;
use std::ops::Bound;
use std::sync::Arc;

use super::account_service::AccountService;
use super::balance_service::BalanceService;
use super::clock::Clock;
use super::commands::backfill::BackfillReport;
use super::commands::ledger::RecordEntryResult;
use super::day_key::DayKey;
use super::error::{LedgerError, LedgerResult};
use super::models::{AccountPatch, AccountState, LedgerSnapshot, NewLedgerEntry};
use crate::backend::storage::LedgerStore;

/// Service that issues daily allowances
#[derive(Clone)]
pub struct AllowanceService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    accounts: AccountService,
    balances: BalanceService,
}

impl AllowanceService {
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
        }
    }

    /// Credit every fully elapsed day after the watermark and move the
    /// watermark to today.
    ///
    /// The daily allowance is read once when the run starts; a concurrent
    /// change only affects later runs.
    pub async fn run_backfill(&self) -> LedgerResult<BackfillReport> {
        let (account, mut snapshot) = self.accounts.load_account().await?;
        let today = self.clock.today();
        let watermark = account.last_processed_date.clone();

        if watermark >= today {
            debug!("Watermark {} is not before today {}, nothing to backfill", watermark, today);
            return Ok(BackfillReport {
                days_visited: 0,
                entries_appended: 0,
                current_balance: account.current_balance,
                last_processed_date: watermark,
            });
        }

        let allowance = account.daily_allowance;
        let mut running = backfill_seed(&snapshot, &account);
        // Pinned together with the first closing balance of the run so a
        // resumed run seeds from the same value
        let mut anchor = (snapshot.closing_at(&watermark) != running).then(|| (watermark.clone(), running));
        let mut days_visited = 0;
        let mut entries_appended = 0;
        info!(
            "Backfilling allowances after {} up to {} at ${:.2}/day, starting balance ${:.2}",
            watermark, today, allowance, running
        );

        let mut cursor = watermark;
        loop {
            let next = cursor.add_days(1);
            if next >= today {
                break;
            }
            days_visited += 1;

            if snapshot.has_allowance_on(&next) {
                debug!("Day {} already has an allowance entry, skipping", next);
            } else {
                let entry = NewLedgerEntry::allowance(allowance, self.clock.start_of_day(&next));
                let id = self
                    .store
                    .append_entry(&next, entry.clone())
                    .await
                    .map_err(LedgerError::store)?;
                info!("Issued allowance {} for ${:.2} on {}", id, allowance, next);
                snapshot
                    .ledger
                    .entry(next.clone())
                    .or_default()
                    .insert(id.clone(), entry.with_id(id));
                entries_appended += 1;
            }

            // Re-derived from the day's entries so an earlier interrupted
            // run cannot leave the chain off by one allowance
            running += snapshot.day_total(&next);
            if snapshot.closing_balances.get(&next) != Some(&running) {
                let mut patch = AccountPatch::new().closing_balance(next.clone(), running);
                if let Some((day, balance)) = anchor.take() {
                    debug!("Pinning closing balance ${:.2} at watermark {}", balance, day);
                    snapshot.closing_balances.insert(day.clone(), balance);
                    patch = patch.closing_balance(day, balance);
                }
                self.store.write_fields(patch).await.map_err(LedgerError::store)?;
                snapshot.closing_balances.insert(next.clone(), running);
            }
            cursor = next;
        }

        let mut patch = AccountPatch::new().last_processed_date(today.clone());
        if running != account.current_balance {
            patch = patch.current_balance(running);
        }
        self.store.write_fields(patch).await.map_err(LedgerError::store)?;

        // Bookings on today or later sit on top of the new chain
        let current_balance = if has_activity_from(&snapshot, &today) {
            self.balances.recalculate_from(&today).await?.current_balance
        } else {
            running
        };

        info!(
            "Backfill complete: visited {} days, issued {} allowances, balance ${:.2}, watermark {}",
            days_visited, entries_appended, current_balance, today
        );
        Ok(BackfillReport {
            days_visited,
            entries_appended,
            current_balance,
            last_processed_date: today,
        })
    }

    /// Credit today's allowance unless today already has one.
    ///
    /// Backfill never touches today, so this is how the current day gets
    /// its allowance. Returns `None` when today was already credited.
    pub async fn issue_today_allowance(&self) -> LedgerResult<Option<RecordEntryResult>> {
        let (account, snapshot) = self.accounts.load_account().await?;
        let today = self.clock.today();
        if snapshot.has_allowance_on(&today) {
            info!("Allowance for {} already issued", today);
            return Ok(None);
        }

        let entry = NewLedgerEntry::allowance(account.daily_allowance, self.clock.now());
        let entry_id = self
            .store
            .append_entry(&today, entry)
            .await
            .map_err(LedgerError::store)?;
        info!("Issued allowance {} for ${:.2} on {}", entry_id, account.daily_allowance, today);

        let report = self.balances.recalculate_from(&today).await?;
        Ok(Some(RecordEntryResult {
            entry_id,
            day: today,
            current_balance: report.current_balance,
        }))
    }
}

/// Starting balance for the walk.
///
/// Normally the account's current balance. When days after the watermark
/// already carry closing balances (bookings made into the gap, or an
/// interrupted run), the current balance may include them, so the walk
/// starts from the closing balance at the watermark instead. A run that
/// seeds from the current balance pins it at the watermark with its first
/// closing balance write, which keeps both cases on the same seed.
fn backfill_seed(snapshot: &LedgerSnapshot, account: &AccountState) -> Decimal {
    let watermark = &account.last_processed_date;
    let indexed_after_watermark = snapshot
        .closing_balances
        .range((Bound::Excluded(watermark.clone()), Bound::Unbounded))
        .next()
        .is_some();
    if indexed_after_watermark {
        snapshot.closing_at(watermark)
    } else {
        account.current_balance
    }
}

fn has_activity_from(snapshot: &LedgerSnapshot, day: &DayKey) -> bool {
    snapshot.ledger.range(day.clone()..).any(|(_, bucket)| !bucket.is_empty())
        || snapshot.closing_balances.range(day.clone()..).next().is_some()
}
