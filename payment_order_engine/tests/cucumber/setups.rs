use cucumber::given;
use payment_order_engine::db_types::MerchantLimits;

use crate::{cucumber::OrderFlowWorld, support::TestSystem};

#[given("a fresh install")]
async fn fresh_database(world: &mut OrderFlowWorld) {
    world.system = Some(TestSystem::new().await);
}

#[given(expr = "an active merchant '{word}' with {int} available")]
async fn active_merchant(world: &mut OrderFlowWorld, merchant_id: String, available: i64) {
    world.system().add_merchant(&merchant_id, available, MerchantLimits::default()).await;
}

#[given(expr = "an active merchant '{word}' with a daily limit of {int}")]
async fn merchant_with_daily_limit(world: &mut OrderFlowWorld, merchant_id: String, limit: i64) {
    let limits = MerchantLimits::default().with_daily_limit(limit.into());
    world.system().add_merchant(&merchant_id, 0, limits).await;
}
