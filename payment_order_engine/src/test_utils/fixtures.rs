use chrono::Utc;

use crate::db_types::{Callback, Customer, Order, OrderId, OrderStatusType, OrderTimestamps, OrderType, Provider};

/// An in-memory deposit order in `status`, with its funds still frozen.
pub fn sample_order(status: OrderStatusType, amount: i64) -> Order {
    let now = Utc::now();
    Order {
        id: 1,
        order_id: OrderId::from("ORD20240610120000123456"),
        merchant_id: "merchant-1".to_string(),
        order_type: OrderType::Deposit,
        amount: amount.into(),
        fee: 0.into(),
        currency: "USD".to_string(),
        status,
        provider: Provider::new("acme-pay"),
        customer: Customer::default(),
        callback: Callback::default(),
        funds_frozen: true,
        timestamps: OrderTimestamps::new(now),
        refund: None,
        dispute: None,
        risk_info: None,
        additional_data: None,
        operations: Vec::new(),
        updated_at: now,
    }
}
