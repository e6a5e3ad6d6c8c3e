use std::fmt::Display;

use chrono::{DateTime, Utc};
use poe_common::Amount;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Callback, Customer, OperationRecord, Order, OrderId, OrderStatusType, OrderType, Provider, Transaction},
    poe_api::errors::OrderFlowError,
};

//--------------------------------------   CreateOrderRequest   --------------------------------------------------------
/// A request to open a new payment order for a merchant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Caller-supplied order id. One is generated when absent.
    pub order_id: Option<OrderId>,
    pub order_type: OrderType,
    pub amount: Amount,
    #[serde(default)]
    pub fee: Amount,
    pub currency: String,
    pub provider: Provider,
    #[serde(default)]
    pub customer: Customer,
    #[serde(default)]
    pub callback: Callback,
}

impl CreateOrderRequest {
    pub fn new<S: Into<String>>(order_type: OrderType, amount: Amount, currency: S, provider: Provider) -> Self {
        Self {
            order_id: None,
            order_type,
            amount,
            fee: Amount::ZERO,
            currency: currency.into(),
            provider,
            customer: Customer::default(),
            callback: Callback::default(),
        }
    }

    pub fn with_order_id<I: Into<OrderId>>(mut self, order_id: I) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_fee(mut self, fee: Amount) -> Self {
        self.fee = fee;
        self
    }

    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customer = customer;
        self
    }

    pub fn with_callback(mut self, callback: Callback) -> Self {
        self.callback = callback;
        self
    }
}

/// The records written by a successful order creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub order: Order,
    pub transaction: Transaction,
}

//--------------------------------------     TransitionData     --------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundRequest {
    /// Defaults to the refundable remainder of the order.
    pub amount: Option<Amount>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeRequest {
    pub reason: Option<String>,
    pub reference: Option<String>,
    /// Used when resolving a dispute.
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRequest {
    pub reason: Option<String>,
    pub score: Option<u32>,
}

/// The payload accompanying a status update. Typed fields are interpreted by the state machine; anything else the
/// caller (usually a provider webhook) wants to keep goes into `extra` and is stored verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionData {
    pub refund: Option<RefundRequest>,
    pub dispute: Option<DisputeRequest>,
    pub risk_info: Option<RiskRequest>,
    pub provider_reference: Option<String>,
    pub reason: Option<String>,
    pub extra: serde_json::Value,
}

impl TransitionData {
    pub fn with_refund(mut self, amount: Option<Amount>, reason: Option<String>) -> Self {
        self.refund = Some(RefundRequest { amount, reason });
        self
    }

    pub fn with_dispute(mut self, dispute: DisputeRequest) -> Self {
        self.dispute = Some(dispute);
        self
    }

    pub fn with_risk_info(mut self, risk: RiskRequest) -> Self {
        self.risk_info = Some(risk);
        self
    }

    pub fn with_provider_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.provider_reference = Some(reference.into());
        self
    }

    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = extra;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == TransitionData::default()
    }

    /// The explicitly requested refund amount, if any.
    pub fn refund_amount(&self) -> Option<Amount> {
        self.refund.as_ref().and_then(|r| r.amount)
    }
}

//--------------------------------------  StatusUpdateRequest   --------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub order_id: OrderId,
    pub to_status: OrderStatusType,
    #[serde(default)]
    pub data: TransitionData,
    /// The idempotency key. Derived from the order id, target status and payload when absent.
    pub operation_id: Option<String>,
    /// Who asked for the change (a user, a webhook, a sweeper). Defaults to `"system"`.
    pub executed_by: Option<String>,
}

impl StatusUpdateRequest {
    pub fn new<I: Into<OrderId>>(order_id: I, to_status: OrderStatusType) -> Self {
        Self { order_id: order_id.into(), to_status, data: TransitionData::default(), operation_id: None, executed_by: None }
    }

    pub fn with_data(mut self, data: TransitionData) -> Self {
        self.data = data;
        self
    }

    pub fn with_operation_id<S: Into<String>>(mut self, operation_id: S) -> Self {
        self.operation_id = Some(operation_id.into());
        self
    }

    pub fn executed_by<S: Into<String>>(mut self, who: S) -> Self {
        self.executed_by = Some(who.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdateResult {
    pub order: Order,
    pub operation_id: String,
    /// True when the operation id had already been applied and nothing was changed by this call.
    pub replayed: bool,
}

/// The outcome of one item in a batch. Items are independent of each other.
#[derive(Debug)]
pub struct BatchUpdateResult {
    pub order_id: OrderId,
    pub result: Result<StatusUpdateResult, OrderFlowError>,
}

impl BatchUpdateResult {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl Display for BatchUpdateResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.result {
            Ok(r) => write!(f, "{}: {} (operation {})", self.order_id, r.order.status, r.operation_id),
            Err(e) => write!(f, "{}: failed. {e}", self.order_id),
        }
    }
}

//--------------------------------------  History & introspection  -----------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistory {
    pub order_id: OrderId,
    pub current_status: OrderStatusType,
    pub operations: Vec<OperationRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransitions {
    pub from: OrderStatusType,
    pub to: Vec<OrderStatusType>,
}

/// A read-only description of the order lifecycle graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachineInfo {
    pub states: Vec<OrderStatusType>,
    pub initial_state: OrderStatusType,
    pub balance_terminal_states: Vec<OrderStatusType>,
    pub transitions: Vec<StateTransitions>,
}

//--------------------------------------      ExpiryResult      --------------------------------------------------------
#[derive(Debug, Default)]
pub struct ExpiryResult {
    /// Pending orders moved to `EXPIRED`.
    pub expired: Vec<Order>,
    /// Processing orders moved to `TIMEOUT`.
    pub timed_out: Vec<Order>,
    /// Orders the sweep could not move this time round, with the reason.
    pub failed: Vec<(OrderId, OrderFlowError)>,
}

impl ExpiryResult {
    pub fn expired_count(&self) -> usize {
        self.expired.len()
    }

    pub fn timed_out_count(&self) -> usize {
        self.timed_out.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn total_count(&self) -> usize {
        self.expired_count() + self.timed_out_count()
    }
}

//--------------------------------------    OrderQueryFilter    --------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub merchant_id: Option<String>,
    pub order_type: Option<OrderType>,
    pub status: Option<Vec<OrderStatusType>>,
    pub created_before: Option<DateTime<Utc>>,
    pub processing_started_before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl OrderQueryFilter {
    pub fn with_merchant_id<S: Into<String>>(mut self, merchant_id: S) -> Self {
        self.merchant_id = Some(merchant_id.into());
        self
    }

    pub fn with_order_type(mut self, order_type: OrderType) -> Self {
        self.order_type = Some(order_type);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn created_before(mut self, before: DateTime<Utc>) -> Self {
        self.created_before = Some(before);
        self
    }

    pub fn processing_started_before(mut self, before: DateTime<Utc>) -> Self {
        self.processing_started_before = Some(before);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.merchant_id.is_none()
            && self.order_type.is_none()
            && self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
            && self.created_before.is_none()
            && self.processing_started_before.is_none()
    }
}
