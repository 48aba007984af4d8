use dotenvy::dotenv;
use log::*;
use loyalty_engine::SqliteDatabase;
use loyalty_reconciler::{accrual::AccrualClient, config::ReconcilerConfig, poller::start_accrual_poller};
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let config = ReconcilerConfig::from_env_or_default();

    info!("🚀️ Starting the accrual reconciler against {}", config.accrual_url);
    let db = match SqliteDatabase::new_with_url(&config.database_url, 5).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Could not open the ledger database: {e}");
            return;
        },
    };
    if let Err(e) = db.run_migrations().await {
        eprintln!("Could not migrate the ledger database: {e}");
        return;
    }
    let client = match AccrualClient::new(&config.accrual_url, config.request_timeout) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{e}");
            return;
        },
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = start_accrual_poller(db, client, &config, shutdown_rx);

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("🚀️ Could not listen for the shutdown signal: {e}");
    }
    info!("🚀️ Shutting down");
    let _ = shutdown_tx.send(true);
    let _ = worker.await;
    println!("Bye!");
}
