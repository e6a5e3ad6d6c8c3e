use chrono::{Duration, Utc};
use payment_order_engine::{db_types::OrderId, LockConfig, LockManagement, LockManager};
use support::TestSystem;

mod support;

#[tokio::test]
async fn leases_are_exclusive_and_reentrant() {
    let system = TestSystem::new().await;
    let locks = LockManager::new(system.db.clone(), LockConfig::default());
    let order_id = OrderId::from("ORD-lock-1");

    let lease = locks.acquire(&order_id, "op-a").await.unwrap().expect("First acquire should succeed");
    assert_eq!(lease.key, "lock:ORD-lock-1");
    assert_eq!(lease.operation_id, "op-a");
    assert!(locks.acquire(&order_id, "op-b").await.unwrap().is_none());

    // The holder may ask again, and gets the same lease back.
    let again = locks.acquire(&order_id, "op-a").await.unwrap().expect("Holder should re-acquire");
    assert_eq!(again.expires_at, lease.expires_at);

    // Only the holder can release.
    assert!(!locks.release(&order_id, "op-b").await.unwrap());
    assert!(locks.current_lease(&order_id).await.unwrap().is_some());
    assert!(locks.release(&order_id, "op-a").await.unwrap());
    assert!(locks.current_lease(&order_id).await.unwrap().is_none());

    assert!(locks.acquire(&order_id, "op-b").await.unwrap().is_some());
    system.tear_down().await;
}

#[tokio::test]
async fn expired_leases_are_reclaimed() {
    let system = TestSystem::new().await;
    let db = &system.db;
    let now = Utc::now();
    let key = "lock:ORD-lock-2";

    let first = db.try_acquire_lease(key, "op-a", now, now + Duration::seconds(1)).await.unwrap();
    assert!(first.is_some());
    let early = now + Duration::milliseconds(500);
    assert!(db.try_acquire_lease(key, "op-b", early, early + Duration::seconds(30)).await.unwrap().is_none());

    let later = now + Duration::seconds(2);
    let taken = db
        .try_acquire_lease(key, "op-b", later, later + Duration::seconds(30))
        .await
        .unwrap()
        .expect("An expired lease should be reclaimed");
    assert_eq!(taken.operation_id, "op-b");
    assert_eq!(taken.expires_at.timestamp_millis(), (later + Duration::seconds(30)).timestamp_millis());

    // The original holder has lost it and cannot release it any more.
    assert!(!db.release_lease(key, "op-a").await.unwrap());
    system.tear_down().await;
}

#[tokio::test]
async fn sweep_removes_only_expired_leases() {
    let system = TestSystem::new().await;
    let db = &system.db;
    let now = Utc::now();
    let past = now - Duration::minutes(5);
    db.try_acquire_lease("lock:old-1", "op-1", past, past + Duration::seconds(30)).await.unwrap();
    db.try_acquire_lease("lock:old-2", "op-2", past, past + Duration::seconds(30)).await.unwrap();
    db.try_acquire_lease("lock:live", "op-3", now, now + Duration::seconds(30)).await.unwrap();

    assert_eq!(db.sweep_expired_leases(now).await.unwrap(), 2);
    assert!(db.fetch_lease("lock:old-1").await.unwrap().is_none());
    assert!(db.fetch_lease("lock:live").await.unwrap().is_some());
    assert_eq!(db.sweep_expired_leases(now).await.unwrap(), 0);
    system.tear_down().await;
}
