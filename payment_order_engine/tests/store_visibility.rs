use chrono::{Duration, Utc};
use payment_order_engine::{
    db_types::{MerchantBalance, MerchantStatus, NewMerchant},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    LockManagement,
    MerchantManagement,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

/// Every write must be committed when the call returns, so that a separate pool sees it straight away.
#[tokio::test]
async fn writes_are_visible_to_other_connections() {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let writer = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    let reader = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");

    writer.create_merchant(NewMerchant::new("m1", "Merchant One").with_available(500.into())).await.unwrap();
    let merchant = reader.fetch_merchant("m1").await.unwrap().expect("merchant should be visible");
    assert_eq!(merchant.balance, MerchantBalance::new(500.into(), 0.into()));

    writer.freeze_funds("m1", 300.into()).await.unwrap();
    let balance = reader.fetch_merchant("m1").await.unwrap().unwrap().balance;
    assert_eq!(balance, MerchantBalance::new(500.into(), 300.into()));

    writer.unfreeze_funds("m1", 300.into()).await.unwrap();
    let balance = reader.fetch_merchant("m1").await.unwrap().unwrap().balance;
    assert_eq!(balance, MerchantBalance::new(500.into(), 0.into()));

    writer.credit_available("m1", 250.into()).await.unwrap();
    let balance = reader.fetch_merchant("m1").await.unwrap().unwrap().balance;
    assert_eq!(balance, MerchantBalance::new(750.into(), 0.into()));

    writer.set_merchant_status("m1", MerchantStatus::Suspended).await.unwrap();
    let merchant = reader.fetch_merchant("m1").await.unwrap().unwrap();
    assert_eq!(merchant.status, MerchantStatus::Suspended);

    let now = Utc::now();
    let lease = writer.try_acquire_lease("order:1", "op-a", now, now + Duration::seconds(30)).await.unwrap();
    assert!(lease.is_some());
    let seen = reader.fetch_lease("order:1").await.unwrap().expect("lease should be visible");
    assert_eq!(seen.operation_id, "op-a");
    // The reader's pool cannot take a lease that the writer holds.
    assert!(reader.try_acquire_lease("order:1", "op-b", now, now + Duration::seconds(30)).await.unwrap().is_none());

    assert!(writer.release_lease("order:1", "op-a").await.unwrap());
    assert!(reader.fetch_lease("order:1").await.unwrap().is_none());

    reader.pool().close().await;
    writer.pool().close().await;
    let _ = Sqlite::drop_database(&url).await;
}
