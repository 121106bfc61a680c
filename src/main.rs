use comanda_server::{AppState, Config, logger};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logger::init_logger();

    tracing::info!("comanda-server starting...");

    let config = Config::from_env();
    let state = AppState::initialize(&config).await?;

    // Periodic self-healing sweep; the HTTP surface lives in another service
    // and talks to the same database.
    let interval = Duration::from_secs(config.reconcile_interval_secs);
    tracing::info!(interval_secs = config.reconcile_interval_secs, "Reconciliation loop running");
    loop {
        tokio::time::sleep(interval).await;
        match state.tables.reconcile_tables().await {
            Ok(0) => tracing::debug!("Reconciliation sweep found no drift"),
            Ok(corrected) => {
                tracing::info!(corrected, "Reconciliation sweep corrected table status drift")
            }
            Err(e) => tracing::error!(error = %e, "Reconciliation sweep failed"),
        }
    }
}
