use serde::{Deserialize, Serialize};

use crate::{
    db_types::{NewOperationRecord, Order, OrderStatusType},
    ledger::BalanceEffect,
};

/// A validated transition, with everything the backend needs to persist it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedTransition {
    /// The order as it should look after the transition.
    pub order: Order,
    /// The status the order must still be in for the write to go ahead.
    pub from_status: OrderStatusType,
    pub effect: BalanceEffect,
    pub operation: NewOperationRecord,
}
