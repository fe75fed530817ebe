//! Read-side views of the ledger: balance, per-day entry lists and
//! week/month closing-balance summaries.
//!
//! Days without a closing balance of their own show the last one before
//! them (carry-forward). Days before any history show zero.

use log::info;
use rust_decimal::Decimal;

use super::account_service::AccountService;
use super::clock::Clock;
use super::commands::summary::{AccountView, DailyClosing, DayEntriesView, PeriodSummary};
use super::day_key::DayKey;
use super::error::LedgerResult;
use super::models::{EntryType, LedgerSnapshot};
use std::sync::Arc;

/// Days shown by the rolling entry list when the caller does not ask
pub const DEFAULT_RECENT_DAYS: u32 = 7;
/// Upper bound on the rolling entry list
pub const MAX_RECENT_DAYS: u32 = 92;

#[derive(Clone)]
pub struct SummaryService {
    clock: Arc<dyn Clock>,
    accounts: AccountService,
}

impl SummaryService {
    pub fn new(clock: Arc<dyn Clock>, accounts: AccountService) -> Self {
        Self { clock, accounts }
    }

    pub async fn account_view(&self) -> LedgerResult<AccountView> {
        let account = self.accounts.account().await?;
        Ok(AccountView {
            account,
            today: self.clock.today(),
        })
    }

    pub async fn entries_for_day(&self, day: &DayKey) -> LedgerResult<DayEntriesView> {
        let snapshot = self.accounts.load().await?;
        Ok(day_view(&snapshot, day))
    }

    /// The last `days` days ending today, newest first
    pub async fn recent_entries(&self, days: u32) -> LedgerResult<Vec<DayEntriesView>> {
        let days = days.clamp(1, MAX_RECENT_DAYS);
        let snapshot = self.accounts.load().await?;
        let today = self.clock.today();
        Ok((0..days)
            .map(|offset| day_view(&snapshot, &today.add_days(-i64::from(offset))))
            .collect())
    }

    /// Monday-to-Sunday week containing `day`
    pub async fn weekly_summary(&self, day: &DayKey) -> LedgerResult<PeriodSummary> {
        let start = day.week_start();
        let end = start.add_days(6);
        let snapshot = self.accounts.load().await?;
        Ok(summarize(&snapshot, start, end))
    }

    pub async fn monthly_summary(&self, year: i32, month: u32) -> LedgerResult<PeriodSummary> {
        let start = DayKey::first_of_month(year, month)?;
        let end = DayKey::last_of_month(year, month)?;
        let snapshot = self.accounts.load().await?;
        let summary = summarize(&snapshot, start, end);
        info!(
            "Monthly summary {}-{:02}: opening ${:.2}, closing ${:.2}",
            year, month, summary.opening_balance, summary.closing_balance
        );
        Ok(summary)
    }
}

fn day_view(snapshot: &LedgerSnapshot, day: &DayKey) -> DayEntriesView {
    DayEntriesView {
        day: day.clone(),
        closing_balance: snapshot.closing_at(day),
        entries: snapshot.sorted_entries_on(day),
    }
}

fn summarize(snapshot: &LedgerSnapshot, start: DayKey, end: DayKey) -> PeriodSummary {
    let mut total_allowance = Decimal::ZERO;
    let mut total_spent = Decimal::ZERO;
    let mut total_bonus = Decimal::ZERO;

    let days = DayKey::range_inclusive(&start, &end)
        .into_iter()
        .map(|day| {
            for entry in snapshot.entries_on(&day) {
                match entry.entry_type {
                    EntryType::Allowance => total_allowance += entry.amount,
                    EntryType::Spend => total_spent -= entry.amount,
                    EntryType::Bonus => total_bonus += entry.amount,
                }
            }
            DailyClosing {
                closing_balance: snapshot.closing_at(&day),
                has_activity: snapshot.has_entries_on(&day),
                day,
            }
        })
        .collect();

    PeriodSummary {
        opening_balance: snapshot.closing_before(&start).map_or(Decimal::ZERO, |(_, balance)| balance),
        closing_balance: snapshot.closing_at(&end),
        start,
        end,
        total_allowance,
        total_spent,
        total_bonus,
        days,
    }
}
