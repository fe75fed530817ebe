//! # Backend Module
//!
//! Everything behind the HTTP boundary of the allowance ledger:
//!
//! - **Domain**: backfill, mutations, recalculation and summaries
//! - **Storage**: the ledger store backends
//! - **IO**: REST endpoints
//! - **Config**: settings loaded from the data directory
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST API, handlers)
//!     ↓
//! Domain Layer (services)
//!     ↓
//! Storage Layer (LedgerStore)
//! ```

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use log::info;
use rust_decimal::Decimal;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::backend::config::{LedgerConfig, StorageKind};
use crate::backend::domain::{
    AccountService, AllowanceService, BalanceService, Clock, LedgerService, MoneyManagementService,
    SummaryService, SystemClock,
};
use crate::backend::storage::{
    CsvConnection, CsvLedgerStore, GitManager, InMemoryLedgerStore, LedgerStore, SqliteLedgerStore,
};

/// Services shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LedgerStore>,
    pub clock: Arc<dyn Clock>,
    pub money_management_service: MoneyManagementService,
    pub account_service: AccountService,
    pub balance_service: BalanceService,
    pub allowance_service: AllowanceService,
    pub ledger_service: LedgerService,
    pub summary_service: SummaryService,
}

impl AppState {
    /// Wire the domain services over one store and clock
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>, default_daily_allowance: Decimal) -> Self {
        let account_service = AccountService::new(store.clone(), clock.clone(), default_daily_allowance);
        let balance_service = BalanceService::new(store.clone(), account_service.clone());
        let allowance_service = AllowanceService::new(
            store.clone(),
            clock.clone(),
            account_service.clone(),
            balance_service.clone(),
        );
        let ledger_service = LedgerService::new(
            store.clone(),
            clock.clone(),
            account_service.clone(),
            balance_service.clone(),
        );
        let summary_service = SummaryService::new(clock.clone(), account_service.clone());

        Self {
            store,
            clock,
            money_management_service: MoneyManagementService::new(),
            account_service,
            balance_service,
            allowance_service,
            ledger_service,
            summary_service,
        }
    }
}

/// Open the configured store and build the application state
pub async fn initialize_backend(config: &LedgerConfig) -> Result<AppState> {
    info!("Setting up {:?} storage in {}", config.storage, config.data_directory.display());
    let store: Arc<dyn LedgerStore> = match config.storage {
        StorageKind::File => {
            let connection = CsvConnection::new(&config.data_directory)?;
            let store = CsvLedgerStore::new(connection);
            if config.git_versioning {
                Arc::new(store.with_git_versioning(GitManager::new()))
            } else {
                Arc::new(store)
            }
        }
        StorageKind::Sqlite => Arc::new(
            SqliteLedgerStore::open(config.data_directory.join(storage::sqlite::DATABASE_FILE)).await?,
        ),
        StorageKind::Memory => Arc::new(InMemoryLedgerStore::new()),
    };

    let clock: Arc<dyn Clock> = match config.utc_offset()? {
        Some(offset) => {
            info!("Using fixed UTC offset {} for day boundaries", offset);
            Arc::new(SystemClock::with_offset(offset))
        }
        None => Arc::new(SystemClock::local()),
    };

    info!("Setting up domain services");
    Ok(AppState::new(store, clock, config.default_daily_allowance))
}

/// The REST router with CORS and request tracing
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost:8080"),
            HeaderValue::from_static("http://127.0.0.1:8080"),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .nest("/api", io::rest::api_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::domain::models::LedgerSnapshot;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_initialize_each_storage_kind() {
        for storage in [StorageKind::File, StorageKind::Sqlite, StorageKind::Memory] {
            let temp_dir = TempDir::new().unwrap();
            let config = LedgerConfig {
                data_directory: temp_dir.path().to_path_buf(),
                storage,
                git_versioning: false,
                utc_offset_minutes: Some(0),
                ..LedgerConfig::default()
            };
            let state = initialize_backend(&config).await.unwrap();
            assert_eq!(state.store.read_all().await.unwrap(), LedgerSnapshot::default());

            let account = state.account_service.account().await.unwrap();
            assert_eq!(account.daily_allowance, config.default_daily_allowance);
            assert_eq!(account.last_processed_date, state.clock.today());
        }
    }
}
