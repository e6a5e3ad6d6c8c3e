use chrono::{DateTime, Utc};
use poe_common::Amount;
use thiserror::Error;

use crate::db_types::{Merchant, MerchantBalance, MerchantStatus, NewMerchant, OrderType};

#[derive(Debug, Clone, Error)]
pub enum MerchantError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Merchant {0} does not exist")]
    MerchantNotFound(String),
    #[error("Merchant {0} already exists")]
    MerchantAlreadyExists(String),
    #[error("Merchant {merchant_id} is {status} and cannot accept new orders")]
    MerchantNotActive { merchant_id: String, status: MerchantStatus },
    #[error("Merchant {0} has insufficient balance for this operation")]
    InsufficientBalance(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
}

impl From<sqlx::Error> for MerchantError {
    fn from(e: sqlx::Error) -> Self {
        MerchantError::DatabaseError(e.to_string())
    }
}

/// Merchant balance accounts.
///
/// Balance changes are single-statement atomic increments. The store rejects any change that would take `available` or
/// `frozen` below zero with [`MerchantError::InsufficientBalance`], leaving the account untouched.
#[allow(async_fn_in_trait)]
pub trait MerchantManagement {
    async fn create_merchant(&self, merchant: NewMerchant) -> Result<Merchant, MerchantError>;

    async fn fetch_merchant(&self, merchant_id: &str) -> Result<Option<Merchant>, MerchantError>;

    async fn set_merchant_status(&self, merchant_id: &str, status: MerchantStatus) -> Result<Merchant, MerchantError>;

    /// `frozen += amount`, but only while the merchant is `ACTIVE`. Returns the balance after the change.
    async fn freeze_funds(&self, merchant_id: &str, amount: Amount) -> Result<MerchantBalance, MerchantError>;

    /// `frozen -= amount`, regardless of the merchant's status. This is the compensating action for
    /// [`Self::freeze_funds`].
    async fn unfreeze_funds(&self, merchant_id: &str, amount: Amount) -> Result<MerchantBalance, MerchantError>;

    /// `available += amount`, e.g. an external top-up that funds payouts.
    async fn credit_available(&self, merchant_id: &str, amount: Amount) -> Result<MerchantBalance, MerchantError>;

    /// The sum of order amounts of the given type created since `since` whose transactions are `PENDING` or `SUCCESS`.
    async fn order_volume_since(
        &self,
        merchant_id: &str,
        order_type: OrderType,
        since: DateTime<Utc>,
    ) -> Result<Amount, MerchantError>;
}
