use std::fmt::Display;

use poe_common::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    db_types::{MerchantStatus, OrderId, OrderStatusType},
    traits::{LockError, MerchantError, PaymentOrderDbError},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitKind {
    Daily,
    Monthly,
    SingleTransaction,
    MinimumAmount,
}

impl Display for LimitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitKind::Daily => write!(f, "Daily"),
            LimitKind::Monthly => write!(f, "Monthly"),
            LimitKind::SingleTransaction => write!(f, "Single transaction"),
            LimitKind::MinimumAmount => write!(f, "Minimum amount"),
        }
    }
}

/// Everything that can go wrong when creating or updating a payment order.
#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Cannot move order from {from} to {to}. {reason}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType, reason: String },
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Merchant {0} has insufficient balance for this operation")]
    InsufficientBalance(String),
    #[error("Order {0} is being modified by another operation. Try again later.")]
    LockContention(OrderId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Merchant {0} does not exist")]
    MerchantNotFound(String),
    #[error("Merchant {merchant_id} is {status} and cannot accept new orders")]
    MerchantNotActive { merchant_id: String, status: MerchantStatus },
    #[error("{kind} limit exceeded. The limit is {limit}, but this order would take it to {attempted}")]
    LimitExceeded { kind: LimitKind, limit: Amount, attempted: Amount },
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderId),
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("{original} The compensating action also failed: {compensation}")]
    CompensationFailed { original: Box<OrderFlowError>, compensation: String },
}

impl OrderFlowError {
    /// Whether trying the same call again later could succeed. The engine itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OrderFlowError::LockContention(_) | OrderFlowError::DatabaseError(_))
    }
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}

impl From<LockError> for OrderFlowError {
    fn from(e: LockError) -> Self {
        match e {
            LockError::DatabaseError(s) => OrderFlowError::DatabaseError(s),
        }
    }
}

impl From<MerchantError> for OrderFlowError {
    fn from(e: MerchantError) -> Self {
        match e {
            MerchantError::DatabaseError(s) => OrderFlowError::DatabaseError(s),
            MerchantError::MerchantNotFound(id) => OrderFlowError::MerchantNotFound(id),
            MerchantError::MerchantAlreadyExists(id) => {
                OrderFlowError::InvalidRequest(format!("Merchant {id} already exists"))
            },
            MerchantError::MerchantNotActive { merchant_id, status } => {
                OrderFlowError::MerchantNotActive { merchant_id, status }
            },
            MerchantError::InsufficientBalance(id) => OrderFlowError::InsufficientBalance(id),
            MerchantError::InvalidAmount(s) => OrderFlowError::InvalidRequest(s),
        }
    }
}

impl From<PaymentOrderDbError> for OrderFlowError {
    fn from(e: PaymentOrderDbError) -> Self {
        match e {
            PaymentOrderDbError::DatabaseError(s) => OrderFlowError::DatabaseError(s),
            PaymentOrderDbError::OrderNotFound(id) => OrderFlowError::OrderNotFound(id),
            PaymentOrderDbError::OrderAlreadyExists(id) => OrderFlowError::OrderAlreadyExists(id),
            // Only reachable when two writers race on one operation id without holding the lease, e.g. after it
            // expired. The other writer won.
            PaymentOrderDbError::DuplicateOperation { order_id, .. } => OrderFlowError::LockContention(order_id),
            PaymentOrderDbError::StaleOrder { order_id, .. } => OrderFlowError::LockContention(order_id),
            PaymentOrderDbError::TransactionNotFound(id) => {
                OrderFlowError::DatabaseError(format!("The transaction record for order {id} is missing"))
            },
            PaymentOrderDbError::MerchantError(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(OrderFlowError::LockContention(OrderId::from("a")).is_retryable());
        assert!(OrderFlowError::DatabaseError("busy".into()).is_retryable());
        assert!(!OrderFlowError::OrderNotFound(OrderId::from("a")).is_retryable());
        let limit =
            OrderFlowError::LimitExceeded { kind: LimitKind::Daily, limit: 100_000.into(), attempted: 110_000.into() };
        assert!(!limit.is_retryable());
        assert_eq!(
            limit.to_string(),
            "Daily limit exceeded. The limit is 100000, but this order would take it to 110000"
        );
    }

    #[test]
    fn backend_errors_map_onto_the_taxonomy() {
        let e: OrderFlowError = PaymentOrderDbError::MerchantError(MerchantError::InsufficientBalance("m1".into())).into();
        assert!(matches!(e, OrderFlowError::InsufficientBalance(id) if id == "m1"));
        let e: OrderFlowError =
            PaymentOrderDbError::StaleOrder { order_id: "o1".into(), expected: OrderStatusType::Pending }.into();
        assert!(e.is_retryable());
    }
}
