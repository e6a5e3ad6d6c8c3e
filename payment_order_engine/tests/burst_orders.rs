use std::time::Duration;

use log::*;
use payment_order_engine::db_types::{MerchantBalance, MerchantLimits, OrderStatusType, OrderType};
use support::TestSystem;

mod support;

const NUM_ORDERS: i64 = 20;
const RATE: u64 = 100; // orders per second

#[tokio::test]
async fn burst_orders() {
    info!("🚀️ Starting order injection test");
    let system = TestSystem::new().await;
    system.add_merchant("burst", 0, MerchantLimits::default()).await;
    let delay = Duration::from_millis(1000 / RATE);
    let mut timer = tokio::time::interval(delay);

    info!("🚀️ Injecting {NUM_ORDERS} orders");
    let mut orders = Vec::new();
    for i in 0..NUM_ORDERS {
        timer.tick().await;
        let order = system.open_order("burst", OrderType::Deposit, 1_000 * (i + 1)).await;
        orders.push(order);
    }
    // Settle every other order, fail the rest.
    for (i, order) in orders.iter().enumerate() {
        let status = if i % 2 == 0 { OrderStatusType::Success } else { OrderStatusType::Failed };
        if let Err(e) = system.move_to(&order.order_id, status).await {
            panic!("Error settling order {i}: {e}");
        }
    }
    let expected: i64 = (0..NUM_ORDERS).filter(|i| i % 2 == 0).map(|i| 1_000 * (i + 1)).sum();
    assert_eq!(system.balance("burst").await, MerchantBalance::new(expected.into(), 0.into()));
    system.tear_down().await;
    info!("🚀️ test complete");
}
