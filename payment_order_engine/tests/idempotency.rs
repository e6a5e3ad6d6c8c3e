use futures_util::future::join_all;
use payment_order_engine::{
    db_types::{MerchantBalance, MerchantLimits, OrderStatusType, OrderType},
    order_objects::{StatusUpdateRequest, TransitionData},
    OrderFlowError,
};
use support::TestSystem;

mod support;

#[tokio::test]
async fn retries_of_the_same_update_are_replays() {
    let system = TestSystem::new().await;
    system.add_merchant("m1", 0, MerchantLimits::default()).await;
    let order = system.open_order("m1", OrderType::Deposit, 5_000).await;
    system.move_to(&order.order_id, OrderStatusType::Processing).await.unwrap();

    let data = TransitionData::default().with_provider_reference("acme-789");
    let first = system.move_with(&order.order_id, OrderStatusType::Success, data.clone()).await.unwrap();
    assert!(!first.replayed);
    let second = system.move_with(&order.order_id, OrderStatusType::Success, data).await.unwrap();
    assert!(second.replayed);
    assert_eq!(second.operation_id, first.operation_id);
    assert_eq!(second.order.status, OrderStatusType::Success);

    // The balance effect was applied once, and the journal has one entry per applied operation.
    assert_eq!(system.balance("m1").await, MerchantBalance::new(5_000.into(), 0.into()));
    let history = system.machine.status_history(&order.order_id).await.unwrap();
    assert_eq!(history.operations.len(), 2);
    system.tear_down().await;
}

#[tokio::test]
async fn explicit_operation_ids_are_honoured() {
    let system = TestSystem::new().await;
    system.add_merchant("m1", 0, MerchantLimits::default()).await;
    let order = system.open_order("m1", OrderType::Deposit, 100).await;
    let request = StatusUpdateRequest::new(order.order_id.clone(), OrderStatusType::Cancelled)
        .with_operation_id("merchant-cancel-1")
        .executed_by("merchant:m1");
    let result = system.machine.update_status(request.clone()).await.unwrap();
    assert_eq!(result.operation_id, "merchant-cancel-1");
    let record = &result.order.operations[0];
    assert_eq!(record.executed_by, "merchant:m1");
    assert_eq!(record.from_status, OrderStatusType::Pending);

    // The same id with a different target is still the same operation, so it replays.
    let mut replay = request;
    replay.to_status = OrderStatusType::Expired;
    let result = system.machine.update_status(replay).await.unwrap();
    assert!(result.replayed);
    assert_eq!(result.order.status, OrderStatusType::Cancelled);
    assert_eq!(system.balance("m1").await, MerchantBalance::default());
    system.tear_down().await;
}

#[tokio::test]
async fn concurrent_updates_apply_exactly_once() {
    let system = TestSystem::new().await;
    system.add_merchant("m1", 0, MerchantLimits::default()).await;
    let order = system.open_order("m1", OrderType::Deposit, 3_000).await;
    system.move_to(&order.order_id, OrderStatusType::Processing).await.unwrap();

    // Ten different operations race to settle the order.
    let updates = (0..10).map(|i| {
        let data = TransitionData::default().with_provider_reference(format!("callback-{i}"));
        system.move_with(&order.order_id, OrderStatusType::Success, data)
    });
    let results = join_all(updates).await;
    let applied = results.iter().filter(|r| matches!(r, Ok(res) if !res.replayed)).count();
    assert_eq!(applied, 1);
    for result in results.iter().filter(|r| r.is_err()) {
        match result {
            Err(OrderFlowError::LockContention(_) | OrderFlowError::InvalidTransition { .. }) => {},
            other => panic!("Unexpected outcome {other:?}"),
        }
    }
    assert_eq!(system.balance("m1").await, MerchantBalance::new(3_000.into(), 0.into()));
    let history = system.machine.status_history(&order.order_id).await.unwrap();
    assert_eq!(history.operations.len(), 2);
    system.tear_down().await;
}

#[tokio::test]
async fn concurrent_retries_of_one_operation_apply_once() {
    let system = TestSystem::new().await;
    system.add_merchant("m1", 0, MerchantLimits::default()).await;
    let order = system.open_order("m1", OrderType::Deposit, 3_000).await;

    let updates = (0..5).map(|_| system.move_to(&order.order_id, OrderStatusType::Expired));
    let results = join_all(updates).await;
    let applied = results.iter().filter(|r| matches!(r, Ok(res) if !res.replayed)).count();
    assert_eq!(applied, 1);
    assert!(results.iter().all(|r| matches!(r, Ok(_) | Err(OrderFlowError::LockContention(_)))));
    assert_eq!(system.balance("m1").await, MerchantBalance::default());
    system.tear_down().await;
}

#[tokio::test]
async fn batch_updates_report_each_item() {
    let system = TestSystem::new().await;
    system.add_merchant("m1", 0, MerchantLimits::default()).await;
    let a = system.open_order("m1", OrderType::Deposit, 100).await;
    let b = system.open_order("m1", OrderType::Deposit, 200).await;
    let updates = vec![
        StatusUpdateRequest::new(a.order_id.clone(), OrderStatusType::Processing),
        StatusUpdateRequest::new(b.order_id.clone(), OrderStatusType::Refunded),
        StatusUpdateRequest::new(b.order_id.clone(), OrderStatusType::Cancelled),
        StatusUpdateRequest::new("missing", OrderStatusType::Cancelled),
    ];
    let results = system.machine.batch_update_status(updates).await;
    assert_eq!(results.len(), 4);
    let outcomes: Vec<_> = results.iter().map(|r| r.is_success()).collect();
    assert_eq!(outcomes, vec![true, false, true, false]);
    assert_eq!(results[1].order_id, b.order_id);
    assert!(matches!(results[3].result, Err(OrderFlowError::OrderNotFound(_))));
    assert_eq!(system.balance("m1").await, MerchantBalance::new(0.into(), 100.into()));
    system.tear_down().await;
}

#[tokio::test]
async fn repeating_a_move_needs_its_own_operation_id() {
    let system = TestSystem::new().await;
    system.add_merchant("m1", 0, MerchantLimits::default()).await;
    let order = system.open_order("m1", OrderType::Deposit, 5_000).await;
    system.move_to(&order.order_id, OrderStatusType::Success).await.unwrap();
    let first_dispute = system.move_to(&order.order_id, OrderStatusType::Disputed).await.unwrap();
    system.move_to(&order.order_id, OrderStatusType::Refunded).await.unwrap();

    // Without an id, a second identical dispute is indistinguishable from a late retry of the first one.
    let retry = system.move_to(&order.order_id, OrderStatusType::Disputed).await.unwrap();
    assert!(retry.replayed);
    assert_eq!(retry.operation_id, first_dispute.operation_id);
    assert_eq!(retry.order.status, OrderStatusType::Refunded);

    // A caller that really means to dispute again says so with a fresh id.
    let request = StatusUpdateRequest::new(order.order_id.clone(), OrderStatusType::Disputed)
        .with_operation_id("second-chargeback");
    let result = system.machine.update_status(request).await.unwrap();
    assert!(!result.replayed);
    assert_eq!(result.order.status, OrderStatusType::Disputed);
    let history = system.machine.status_history(&order.order_id).await.unwrap();
    assert_eq!(history.operations.len(), 4);
    assert_eq!(system.balance("m1").await, MerchantBalance::default());
    system.tear_down().await;
}
