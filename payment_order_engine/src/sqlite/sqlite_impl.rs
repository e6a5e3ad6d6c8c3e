//! `SqliteDatabase` is a concrete implementation of a payment order engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. SQLite gives us real transactions, so a status transition (journal entry, balance effect, order and
//! transaction updates) is written as one unit. Every other write also runs in its own transaction and is committed
//! before the method returns, so the change is visible to every connection in the pool.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use poe_common::Amount;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{db_url, locks, merchants, new_pool, operations, orders, transactions};
use crate::{
    db_types::{
        BalanceSnapshot,
        LockLease,
        Merchant,
        MerchantBalance,
        MerchantStatus,
        NewMerchant,
        NewOrder,
        OperationRecord,
        Order,
        OrderId,
        OrderType,
        Transaction,
    },
    order_objects::{CreatedOrder, OrderQueryFilter},
    traits::{
        AppliedTransition,
        LockError,
        LockManagement,
        MerchantError,
        MerchantManagement,
        OrderManagement,
        PaymentOrderDatabase,
        PaymentOrderDbError,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl PaymentOrderDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder, snapshot: BalanceSnapshot) -> Result<CreatedOrder, PaymentOrderDbError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, &mut tx).await?;
        let transaction = transactions::insert_transaction(&order, snapshot, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order [{}] and its transaction have been saved", order.order_id);
        Ok(CreatedOrder { order, transaction })
    }

    async fn apply_transition(&self, transition: AppliedTransition) -> Result<Order, PaymentOrderDbError> {
        let AppliedTransition { order, from_status, effect, operation } = transition;
        let order_id = order.order_id.clone();
        let now = order.updated_at;
        let mut tx = self.pool.begin().await?;
        // The journal goes first: a concurrent replay of the same operation fails here and rolls everything back.
        let record = operations::insert_operation(operation, &mut tx).await?;
        trace!("🗃️ Operation {} journalled for order [{order_id}]", record.operation_id);
        let snapshot = if effect.is_none() {
            None
        } else {
            let after = merchants::adjust_balance(
                &order.merchant_id,
                effect.available_delta,
                effect.frozen_delta,
                now,
                &mut tx,
            )
            .await?;
            Some(BalanceSnapshot { before: effect.revert_from(after), after })
        };
        let updated = orders::update_order_state(&order, from_status, &mut tx)
            .await?
            .ok_or_else(|| PaymentOrderDbError::StaleOrder { order_id: order_id.clone(), expected: from_status })?;
        transactions::update_transaction(&order_id, updated.status, effect.available_delta, snapshot, now, &mut tx)
            .await?
            .ok_or_else(|| PaymentOrderDbError::TransactionNotFound(order_id.clone()))?;
        tx.commit().await?;
        debug!("🗃️ Order [{order_id}] moved from {from_status} to {}. Balance effect: {effect}", updated.status);
        Ok(updated)
    }

    async fn close(&mut self) -> Result<(), PaymentOrderDbError> {
        self.pool.close().await;
        info!("🗃️ Database connection pool closed");
        Ok(())
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentOrderDbError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_with_operations(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentOrderDbError> {
        let mut conn = self.pool.acquire().await?;
        let order = match orders::fetch_order(order_id, &mut conn).await? {
            Some(order) => {
                let ops = operations::fetch_operations(order_id, &mut conn).await?;
                Some(order.with_operations(ops))
            },
            None => None,
        };
        Ok(order)
    }

    async fn fetch_transaction(&self, order_id: &OrderId) -> Result<Option<Transaction>, PaymentOrderDbError> {
        let mut conn = self.pool.acquire().await?;
        let tx = transactions::fetch_transaction(order_id, &mut conn).await?;
        Ok(tx)
    }

    async fn fetch_operations(&self, order_id: &OrderId) -> Result<Vec<OperationRecord>, PaymentOrderDbError> {
        let mut conn = self.pool.acquire().await?;
        let ops = operations::fetch_operations(order_id, &mut conn).await?;
        Ok(ops)
    }

    async fn fetch_operation(
        &self,
        order_id: &OrderId,
        operation_id: &str,
    ) -> Result<Option<OperationRecord>, PaymentOrderDbError> {
        let mut conn = self.pool.acquire().await?;
        let op = operations::fetch_operation(order_id, operation_id, &mut conn).await?;
        Ok(op)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, PaymentOrderDbError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(query, &mut conn).await?;
        Ok(orders)
    }
}

impl MerchantManagement for SqliteDatabase {
    async fn create_merchant(&self, merchant: NewMerchant) -> Result<Merchant, MerchantError> {
        let mut tx = self.pool.begin().await?;
        let merchant = merchants::insert_merchant(merchant, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(merchant)
    }

    async fn fetch_merchant(&self, merchant_id: &str) -> Result<Option<Merchant>, MerchantError> {
        let mut conn = self.pool.acquire().await?;
        let merchant = merchants::fetch_merchant(merchant_id, &mut conn).await?;
        Ok(merchant)
    }

    async fn set_merchant_status(&self, merchant_id: &str, status: MerchantStatus) -> Result<Merchant, MerchantError> {
        let mut tx = self.pool.begin().await?;
        let merchant = merchants::update_status(merchant_id, status, Utc::now(), &mut tx)
            .await?
            .ok_or_else(|| MerchantError::MerchantNotFound(merchant_id.to_string()))?;
        tx.commit().await?;
        Ok(merchant)
    }

    async fn freeze_funds(&self, merchant_id: &str, amount: Amount) -> Result<MerchantBalance, MerchantError> {
        let mut tx = self.pool.begin().await?;
        let balance = merchants::freeze_funds(merchant_id, amount, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(balance)
    }

    async fn unfreeze_funds(&self, merchant_id: &str, amount: Amount) -> Result<MerchantBalance, MerchantError> {
        let mut tx = self.pool.begin().await?;
        let balance = merchants::adjust_balance(merchant_id, Amount::ZERO, -amount, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(balance)
    }

    async fn credit_available(&self, merchant_id: &str, amount: Amount) -> Result<MerchantBalance, MerchantError> {
        if !amount.is_positive() {
            return Err(MerchantError::InvalidAmount(format!("A credit must be positive, not {amount}")));
        }
        let mut tx = self.pool.begin().await?;
        let balance = merchants::adjust_balance(merchant_id, amount, Amount::ZERO, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        Ok(balance)
    }

    async fn order_volume_since(
        &self,
        merchant_id: &str,
        order_type: OrderType,
        since: DateTime<Utc>,
    ) -> Result<Amount, MerchantError> {
        let mut conn = self.pool.acquire().await?;
        let volume = merchants::order_volume_since(merchant_id, order_type, since, &mut conn).await?;
        Ok(volume)
    }
}

impl LockManagement for SqliteDatabase {
    async fn try_acquire_lease(
        &self,
        key: &str,
        operation_id: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<LockLease>, LockError> {
        let mut tx = self.pool.begin().await?;
        let lease = locks::try_acquire(key, operation_id, now, expires_at, &mut tx).await?;
        tx.commit().await?;
        Ok(lease)
    }

    async fn release_lease(&self, key: &str, operation_id: &str) -> Result<bool, LockError> {
        let mut tx = self.pool.begin().await?;
        let released = locks::release(key, operation_id, &mut tx).await?;
        tx.commit().await?;
        Ok(released)
    }

    async fn fetch_lease(&self, key: &str) -> Result<Option<LockLease>, LockError> {
        let mut conn = self.pool.acquire().await?;
        let lease = locks::fetch(key, &mut conn).await?;
        Ok(lease)
    }

    async fn sweep_expired_leases(&self, now: DateTime<Utc>) -> Result<u64, LockError> {
        let mut tx = self.pool.begin().await?;
        let count = locks::sweep_expired(now, &mut tx).await?;
        tx.commit().await?;
        Ok(count)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using `POE_DATABASE_URL` or the default database location.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date with the migrations embedded in this crate.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
