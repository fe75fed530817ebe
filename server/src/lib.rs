pub mod backend;

use anyhow::Result;
use axum::serve;
use log::{info, warn};
use std::sync::Arc;
use tokio::net::TcpListener;

use backend::config::LedgerConfig;
use backend::domain::models::LedgerSnapshot;
use backend::{create_router, initialize_backend};

/// Start the ledger: open the store, catch up on missed allowances and serve
/// the REST API until the process is stopped
pub async fn run(config: LedgerConfig) -> Result<()> {
    let app_state = initialize_backend(&config).await?;

    // A failed startup backfill is retried by the next run; serve anyway
    match app_state.allowance_service.run_backfill().await {
        Ok(report) => info!(
            "Startup backfill credited {} days, balance ${:.2}",
            report.entries_appended, report.current_balance
        ),
        Err(e) => warn!("Startup backfill failed: {}", e),
    }

    let _balance_log = app_state.store.subscribe(Arc::new(|snapshot: &LedgerSnapshot| {
        if let Some(account) = &snapshot.account {
            info!("Ledger changed, balance is now ${:.2}", account.current_balance);
        }
    }));

    let router = create_router(app_state);
    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("Serving allowance ledger API at http://{}/api", listener.local_addr()?);
    serve(listener, router).await?;
    Ok(())
}
