use chrono::Duration;
use log::*;
use payment_order_engine::{db_types::Order, events::EventProducers, LockConfig, OrderStateMachine, SqliteDatabase};
use tokio::task::JoinHandle;

/// Starts the lock sweep worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_lock_sweep_worker(db: SqliteDatabase, interval: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let machine = OrderStateMachine::new(db, LockConfig::default(), EventProducers::default());
        info!("🕰️ Lock sweep worker started. Sweeping every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            trace!("🕰️ Running lock sweep");
            match machine.sweep_expired_locks().await {
                Ok(0) => trace!("🕰️ No expired leases"),
                Ok(count) => info!("🕰️ {count} expired leases removed"),
                Err(e) => error!("🕰️ Error running lock sweep: {e}"),
            }
        }
    })
}

/// Starts the expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_expiry_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    lock_config: LockConfig,
    interval: std::time::Duration,
    pending_timeout: Duration,
    processing_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        let machine = OrderStateMachine::new(db, lock_config, producers);
        info!("🕰️ Order expiry worker started. Sweeping every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🕰️ Running order expiry job");
            match machine.expire_stale_orders(pending_timeout, processing_timeout).await {
                Ok(result) => {
                    if result.total_count() > 0 {
                        info!("🕰️ {} orders expired or timed out", result.total_count());
                    }
                    debug!("🕰️ {} Expired pending orders: {}", result.expired_count(), order_list(&result.expired));
                    debug!("🕰️ {} Timed out orders: {}", result.timed_out_count(), order_list(&result.timed_out));
                    for (order_id, e) in &result.failed {
                        warn!("🕰️ Order {order_id} could not be swept this time. {e}");
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running order expiry job: {e}");
                },
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] order_id: {} merchant: {}", o.id, o.order_id, o.merchant_id))
        .collect::<Vec<String>>()
        .join(", ")
}
