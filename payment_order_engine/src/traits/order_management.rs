use thiserror::Error;

use crate::{
    db_types::{OperationRecord, Order, OrderId, OrderStatusType, Transaction},
    order_objects::OrderQueryFilter,
    traits::MerchantError,
};

#[derive(Debug, Clone, Error)]
pub enum PaymentOrderDbError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("Operation {operation_id} has already been applied to order {order_id}")]
    DuplicateOperation { order_id: OrderId, operation_id: String },
    #[error("Order {order_id} is no longer {expected}. It was changed by someone else.")]
    StaleOrder { order_id: OrderId, expected: OrderStatusType },
    #[error("The transaction record for order {0} is missing")]
    TransactionNotFound(OrderId),
    #[error("{0}")]
    MerchantError(#[from] MerchantError),
}

impl From<sqlx::Error> for PaymentOrderDbError {
    fn from(e: sqlx::Error) -> Self {
        PaymentOrderDbError::DatabaseError(e.to_string())
    }
}

/// Read access to orders, their ledger transactions and their idempotency journals.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches the order without its journal.
    async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentOrderDbError>;

    /// Fetches the order with [`Order::operations`] populated, oldest operation first.
    async fn fetch_order_with_operations(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentOrderDbError>;

    async fn fetch_transaction(&self, order_id: &OrderId) -> Result<Option<Transaction>, PaymentOrderDbError>;

    async fn fetch_operations(&self, order_id: &OrderId) -> Result<Vec<OperationRecord>, PaymentOrderDbError>;

    /// Looks up a single journal entry. This is the idempotency check.
    async fn fetch_operation(
        &self,
        order_id: &OrderId,
        operation_id: &str,
    ) -> Result<Option<OperationRecord>, PaymentOrderDbError>;

    /// Orders matching the filter, oldest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, PaymentOrderDbError>;
}
