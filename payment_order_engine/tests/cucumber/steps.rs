use std::{str::FromStr, time::Duration};

use cucumber::{then, when};
use payment_order_engine::{
    db_types::{MerchantBalance, MerchantStatus, OrderStatusType, OrderType},
    order_objects::TransitionData,
    OrderFlowError,
};

use crate::cucumber::OrderFlowWorld;

fn status(s: &str) -> OrderStatusType {
    OrderStatusType::from_str(s).unwrap_or_else(|_| panic!("{s} is not an order status"))
}

#[when(expr = "merchant '{word}' opens a {word} order {word} for {int}")]
async fn open_order(world: &mut OrderFlowWorld, merchant_id: String, order_type: String, alias: String, amount: i64) {
    let order_type = OrderType::from_str(&order_type).expect("Not an order type");
    match world.system().try_open_order(&merchant_id, order_type, amount).await {
        Ok(order) => {
            world.orders.insert(alias, order.order_id);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e),
    }
}

#[when(expr = "order {word} moves to {word}")]
async fn move_order(world: &mut OrderFlowWorld, alias: String, to: String) {
    let order_id = world.order_id(&alias);
    let result = world.system().move_to(&order_id, status(&to)).await;
    world.last_error = result.as_ref().err().cloned();
    world.last_result = Some(result);
}

#[when(expr = "order {word} is refunded {int}")]
async fn partial_refund(world: &mut OrderFlowWorld, alias: String, amount: i64) {
    let order_id = world.order_id(&alias);
    let data = TransitionData::default().with_refund(Some(amount.into()), None);
    let result = world.system().move_with(&order_id, OrderStatusType::PartialRefunded, data).await;
    world.last_error = result.as_ref().err().cloned();
    world.last_result = Some(result);
}

#[when(expr = "merchant '{word}' is suspended")]
async fn suspend(world: &mut OrderFlowWorld, merchant_id: String) {
    world.system().merchants.set_merchant_status(&merchant_id, MerchantStatus::Suspended).await.unwrap();
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut OrderFlowWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[when("the expiry sweep runs")]
async fn expiry_sweep(world: &mut OrderFlowWorld) {
    let zero = chrono::Duration::zero();
    world.system().machine.expire_stale_orders(zero, zero).await.expect("Expiry sweep failed");
}

#[then(expr = "order {word} is {word}")]
async fn order_status(world: &mut OrderFlowWorld, alias: String, expected: String) {
    let order_id = world.order_id(&alias);
    let order = world.system().machine.fetch_order(&order_id).await.unwrap().expect("Order should exist");
    assert_eq!(order.status, status(&expected));
}

#[then(expr = "merchant '{word}' has {int} available and {int} frozen")]
async fn merchant_balance(world: &mut OrderFlowWorld, merchant_id: String, available: i64, frozen: i64) {
    let balance = world.system().balance(&merchant_id).await;
    assert_eq!(balance, MerchantBalance::new(available.into(), frozen.into()));
}

#[then("the update was a replay")]
async fn was_replay(world: &mut OrderFlowWorld) {
    match &world.last_result {
        Some(Ok(result)) => assert!(result.replayed, "Expected a replay"),
        other => panic!("Expected a successful replay, got {other:?}"),
    }
}

#[then(expr = "the request fails with {word}")]
async fn request_fails(world: &mut OrderFlowWorld, kind: String) {
    let err = world.last_error.as_ref().expect("Expected the last request to fail");
    let matched = match kind.as_str() {
        "InvalidTransition" => matches!(err, OrderFlowError::InvalidTransition { .. }),
        "LimitExceeded" => matches!(err, OrderFlowError::LimitExceeded { .. }),
        "MerchantNotActive" => matches!(err, OrderFlowError::MerchantNotActive { .. }),
        "InsufficientBalance" => matches!(err, OrderFlowError::InsufficientBalance(_)),
        _ => panic!("Unknown error kind {kind}"),
    };
    assert!(matched, "Expected {kind}, got {err}");
}

#[then(expr = "order {word} has {int} journal entries")]
async fn journal_entries(world: &mut OrderFlowWorld, alias: String, count: usize) {
    let order_id = world.order_id(&alias);
    let history = world.system().machine.status_history(&order_id).await.unwrap();
    assert_eq!(history.operations.len(), count);
}
