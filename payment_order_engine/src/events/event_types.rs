use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

/// Published once a new order and its transaction have been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: Order,
}

impl OrderCreatedEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Published after a status transition has been persisted. Replays do not publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusChangedEvent {
    pub old_status: OrderStatusType,
    pub order: Order,
    pub operation_id: String,
}

impl OrderStatusChangedEvent {
    pub fn new(old_status: OrderStatusType, order: Order, operation_id: String) -> Self {
        Self { old_status, order, operation_id }
    }

    pub fn new_status(&self) -> OrderStatusType {
        self.order.status
    }
}
