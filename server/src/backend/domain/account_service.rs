//! Account access for the ledger services.
//!
//! The account record is created lazily: the first read that finds no
//! account writes one with a zero balance, the configured daily allowance and
//! today's date as watermark. A missing account is therefore never an error.

use log::info;
use rust_decimal::Decimal;
use std::sync::Arc;

use super::clock::Clock;
use super::error::{LedgerError, LedgerResult};
use super::models::{AccountPatch, AccountState, LedgerSnapshot};
use crate::backend::storage::LedgerStore;

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    default_daily_allowance: Decimal,
}

impl AccountService {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, default_daily_allowance: Decimal) -> Self {
        Self {
            store,
            clock,
            default_daily_allowance,
        }
    }

    /// Read the whole ledger, initializing the account on first access
    pub async fn load(&self) -> LedgerResult<LedgerSnapshot> {
        let mut snapshot = self.store.read_all().await.map_err(LedgerError::store)?;
        if snapshot.account.is_none() {
            let account = AccountState::initial(self.clock.today(), self.default_daily_allowance);
            info!(
                "No account found, initializing with daily allowance ${:.2} and watermark {}",
                account.daily_allowance, account.last_processed_date
            );
            self.store
                .write_fields(AccountPatch::from_account(&account))
                .await
                .map_err(LedgerError::store)?;
            snapshot.account = Some(account);
        }
        Ok(snapshot)
    }

    /// Load the ledger and split off the account record
    pub async fn load_account(&self) -> LedgerResult<(AccountState, LedgerSnapshot)> {
        let snapshot = self.load().await?;
        let account = snapshot
            .account
            .clone()
            .ok_or_else(|| LedgerError::store(anyhow::anyhow!("Account vanished after initialization")))?;
        Ok((account, snapshot))
    }

    pub async fn account(&self) -> LedgerResult<AccountState> {
        Ok(self.load_account().await?.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::clock::FixedClock;
    use crate::backend::storage::InMemoryLedgerStore;
    use rust_decimal_macros::dec;

    fn service(store: &InMemoryLedgerStore) -> AccountService {
        let clock = FixedClock::at("2024-03-10T08:00:00+00:00").unwrap();
        AccountService::new(Arc::new(store.clone()), Arc::new(clock), dec!(2.5))
    }

    #[tokio::test]
    async fn test_first_access_initializes_account() {
        let store = InMemoryLedgerStore::new();
        let account = service(&store).account().await.unwrap();
        assert_eq!(account.current_balance, Decimal::ZERO);
        assert_eq!(account.daily_allowance, dec!(2.5));
        assert_eq!(account.last_processed_date.as_str(), "2024-03-10");

        // Persisted, not just returned
        let stored = store.read_all().await.unwrap().account.unwrap();
        assert_eq!(stored, account);
    }

    #[tokio::test]
    async fn test_existing_account_is_left_alone() {
        let store = InMemoryLedgerStore::new();
        let existing = AccountState {
            current_balance: dec!(42),
            daily_allowance: dec!(7),
            last_processed_date: crate::backend::domain::day_key::DayKey::parse("2024-01-01").unwrap(),
        };
        store.write_fields(AccountPatch::from_account(&existing)).await.unwrap();
        assert_eq!(service(&store).account().await.unwrap(), existing);
    }

    #[tokio::test]
    async fn test_store_outage_is_reported() {
        let store = InMemoryLedgerStore::new();
        store.set_write_budget(Some(0));
        let result = service(&store).load().await;
        assert!(matches!(result, Err(LedgerError::StoreUnavailable(_))));
    }
}
