use std::time::Duration;

use log::*;
use payment_order_engine::{
    db_types::{MerchantLimits, NewMerchant, OrderStatusType, OrderType, Provider},
    events::EventProducers,
    order_objects::{CreateOrderRequest, StatusUpdateRequest},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    LockConfig,
    LockManager,
    MerchantApi,
    OrderCreationApi,
    OrderStateMachine,
    PaymentOrderDatabase,
    SqliteDatabase,
};
use payment_order_sweeper::{config::SweeperConfig, sweeper::start_workers};
use sqlx::{migrate::MigrateDatabase, Sqlite};

#[tokio::test]
async fn workers_sweep_leases_and_stale_orders() {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let mut db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating database");

    let merchants = MerchantApi::new(db.clone());
    merchants.create_merchant(NewMerchant::new("m1", "Merchant One").with_limits(MerchantLimits::default())).await.unwrap();
    let creation = OrderCreationApi::new(db.clone(), EventProducers::default());
    let request = |amount: i64| CreateOrderRequest::new(OrderType::Deposit, amount.into(), "USD", Provider::new("acme"));
    let stale = creation.create_order(request(1_000), "m1").await.unwrap().order;
    let stuck = creation.create_order(request(2_000), "m1").await.unwrap().order;
    let machine = OrderStateMachine::new(db.clone(), LockConfig::default(), EventProducers::default());
    machine.update_status(StatusUpdateRequest::new(stuck.order_id.clone(), OrderStatusType::Processing)).await.unwrap();

    // An abandoned lease on an unrelated order
    let short = LockManager::new(db.clone(), LockConfig::with_ttl(chrono::Duration::milliseconds(10)));
    short.acquire(&"abandoned".into(), "crashed-op").await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let config = SweeperConfig {
        database_url: url.clone(),
        lock_sweep_interval: Duration::from_millis(50),
        expiry_sweep_interval: Duration::from_millis(50),
        pending_order_timeout: chrono::Duration::milliseconds(1),
        processing_order_timeout: chrono::Duration::milliseconds(1),
        ..SweeperConfig::default()
    };
    let workers = start_workers(&db, &config, EventProducers::default());
    tokio::time::sleep(Duration::from_millis(300)).await;
    for worker in workers {
        worker.abort();
    }

    let stale = machine.fetch_order(&stale.order_id).await.unwrap().unwrap();
    assert_eq!(stale.status, OrderStatusType::Expired);
    let stuck = machine.fetch_order(&stuck.order_id).await.unwrap().unwrap();
    assert_eq!(stuck.status, OrderStatusType::Timeout);
    assert_eq!(stuck.operations.last().unwrap().executed_by, "system:expiry-sweeper");
    let balance = merchants.balance("m1").await.unwrap();
    assert!(balance.frozen.is_zero());
    assert!(short.current_lease(&"abandoned".into()).await.unwrap().is_none());

    db.close().await.unwrap();
    Sqlite::drop_database(&url).await.unwrap();
    info!("🚀️ test complete");
}
