#![allow(dead_code)]
//! Shared setup for the engine's integration tests.
use log::*;
use payment_order_engine::{
    db_types::{Merchant, MerchantBalance, MerchantLimits, NewMerchant, Order, OrderId, OrderStatusType, OrderType, Provider},
    events::EventProducers,
    order_objects::{CreateOrderRequest, StatusUpdateRequest, StatusUpdateResult, TransitionData},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    LockConfig,
    MerchantApi,
    OrderCreationApi,
    OrderFlowError,
    OrderStateMachine,
    SqliteDatabase,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

/// A complete engine on a fresh database.
#[derive(Debug)]
pub struct TestSystem {
    pub url: String,
    pub db: SqliteDatabase,
    pub merchants: MerchantApi<SqliteDatabase>,
    pub creation: OrderCreationApi<SqliteDatabase>,
    pub machine: OrderStateMachine<SqliteDatabase>,
}

impl TestSystem {
    pub async fn new() -> Self {
        Self::with_producers(EventProducers::default(), LockConfig::default()).await
    }

    pub async fn with_producers(producers: EventProducers, lock_config: LockConfig) -> Self {
        let url = random_db_path();
        prepare_test_env(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
        let merchants = MerchantApi::new(db.clone());
        let creation = OrderCreationApi::new(db.clone(), producers.clone());
        let machine = OrderStateMachine::new(db.clone(), lock_config, producers);
        Self { url, db, merchants, creation, machine }
    }

    pub async fn add_merchant(&self, merchant_id: &str, available: i64, limits: MerchantLimits) -> Merchant {
        let merchant = NewMerchant::new(merchant_id, merchant_id).with_limits(limits).with_available(available.into());
        self.merchants.create_merchant(merchant).await.expect("Error creating merchant")
    }

    pub async fn try_open_order(
        &self,
        merchant_id: &str,
        order_type: OrderType,
        amount: i64,
    ) -> Result<Order, OrderFlowError> {
        let request = CreateOrderRequest::new(order_type, amount.into(), "USD", Provider::new("acme-pay"));
        self.creation.create_order(request, merchant_id).await.map(|created| created.order)
    }

    pub async fn open_order(&self, merchant_id: &str, order_type: OrderType, amount: i64) -> Order {
        self.try_open_order(merchant_id, order_type, amount).await.expect("Error creating order")
    }

    pub async fn move_to(&self, order_id: &OrderId, status: OrderStatusType) -> Result<StatusUpdateResult, OrderFlowError> {
        self.move_with(order_id, status, TransitionData::default()).await
    }

    pub async fn move_with(
        &self,
        order_id: &OrderId,
        status: OrderStatusType,
        data: TransitionData,
    ) -> Result<StatusUpdateResult, OrderFlowError> {
        let request = StatusUpdateRequest::new(order_id.clone(), status).with_data(data);
        self.machine.update_status(request).await
    }

    pub async fn balance(&self, merchant_id: &str) -> MerchantBalance {
        self.merchants.balance(merchant_id).await.expect("Error fetching balance")
    }

    pub async fn tear_down(mut self) {
        if let Err(e) = self.machine.shutdown().await {
            error!("🚀️ Failed to close database: {e}");
        }
        if let Err(e) = Sqlite::drop_database(&self.url).await {
            warn!("🚀️ Could not remove test database {}: {e}", self.url);
        }
    }
}
