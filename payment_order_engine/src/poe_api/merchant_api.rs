//! Unifies API for managing merchants and reading their orders.

use std::fmt::Debug;

use log::*;
use poe_common::Amount;

use crate::{
    db_types::{Merchant, MerchantBalance, MerchantStatus, NewMerchant, Order, OrderId, Transaction},
    order_objects::OrderQueryFilter,
    poe_api::errors::OrderFlowError,
    traits::{MerchantError, MerchantManagement, OrderManagement},
};

/// The `MerchantApi` manages merchant accounts and gives read access to their orders.
///
/// Balances are only ever changed through atomic increments, so the API never hands out a balance for the caller to
/// modify and write back.
pub struct MerchantApi<B> {
    db: B,
}

impl<B> Debug for MerchantApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MerchantApi")
    }
}

impl<B> MerchantApi<B>
where B: MerchantManagement + OrderManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn create_merchant(&self, merchant: NewMerchant) -> Result<Merchant, MerchantError> {
        if merchant.available.is_negative() {
            return Err(MerchantError::InvalidAmount(format!(
                "Opening balance cannot be negative ({})",
                merchant.available
            )));
        }
        let merchant = self.db.create_merchant(merchant).await?;
        info!("🗃️ Merchant {} ({}) created", merchant.merchant_id, merchant.name);
        Ok(merchant)
    }

    /// Fetches the merchant with the given id. If no merchant exists, `None` is returned.
    pub async fn fetch_merchant(&self, merchant_id: &str) -> Result<Option<Merchant>, MerchantError> {
        self.db.fetch_merchant(merchant_id).await
    }

    pub async fn balance(&self, merchant_id: &str) -> Result<MerchantBalance, MerchantError> {
        self.db
            .fetch_merchant(merchant_id)
            .await?
            .map(|m| m.balance)
            .ok_or_else(|| MerchantError::MerchantNotFound(merchant_id.to_string()))
    }

    /// Suspended or closed merchants keep their existing orders, but cannot open new ones.
    pub async fn set_merchant_status(
        &self,
        merchant_id: &str,
        status: MerchantStatus,
    ) -> Result<Merchant, MerchantError> {
        let merchant = self.db.set_merchant_status(merchant_id, status).await?;
        info!("🗃️ Merchant {merchant_id} is now {status}");
        Ok(merchant)
    }

    /// Adds funds to the merchant's available balance.
    pub async fn credit_available(&self, merchant_id: &str, amount: Amount) -> Result<MerchantBalance, MerchantError> {
        if !amount.is_positive() {
            return Err(MerchantError::InvalidAmount(format!("Credits must be positive, not {amount}")));
        }
        let balance = self.db.credit_available(merchant_id, amount).await?;
        debug!("🗃️ Credited {amount} to {merchant_id}. Balance: {balance}");
        Ok(balance)
    }

    pub async fn orders_for_merchant(
        &self,
        merchant_id: &str,
        query: OrderQueryFilter,
    ) -> Result<Vec<Order>, OrderFlowError> {
        let orders = self.db.search_orders(query.with_merchant_id(merchant_id)).await?;
        trace!("🗃️ {} orders found for {merchant_id}", orders.len());
        Ok(orders)
    }

    pub async fn transaction_for_order(&self, order_id: &OrderId) -> Result<Option<Transaction>, OrderFlowError> {
        let tx = self.db.fetch_transaction(order_id).await?;
        Ok(tx)
    }
}
