use log::*;
use payment_order_engine::{events::EventProducers, LockConfig, PaymentOrderDatabase, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::{
    config::SweeperConfig,
    errors::SweeperError,
    workers::{start_expiry_worker, start_lock_sweep_worker},
};

/// Connects to the database, starts both workers and runs until Ctrl-C is received.
pub async fn run_sweeper(config: SweeperConfig) -> Result<(), SweeperError> {
    let mut db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections)
        .await
        .map_err(|e| SweeperError::DatabaseConnection(e.to_string()))?;
    if config.run_migrations {
        db.migrate().await.map_err(|e| SweeperError::Migration(e.to_string()))?;
    }
    let workers = start_workers(&db, &config, EventProducers::default());
    tokio::signal::ctrl_c().await?;
    info!("🚀️ Shutdown signal received. Stopping workers");
    for worker in workers {
        worker.abort();
    }
    db.close().await.map_err(|e| SweeperError::Shutdown(e.to_string()))?;
    Ok(())
}

pub fn start_workers(db: &SqliteDatabase, config: &SweeperConfig, producers: EventProducers) -> Vec<JoinHandle<()>> {
    let lock_sweep = start_lock_sweep_worker(db.clone(), config.lock_sweep_interval);
    let expiry = start_expiry_worker(
        db.clone(),
        producers,
        LockConfig::with_ttl(config.lock_ttl),
        config.expiry_sweep_interval,
        config.pending_order_timeout,
        config.processing_order_timeout,
    );
    vec![lock_sweep, expiry]
}
