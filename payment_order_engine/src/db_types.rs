use std::{convert::Infallible, fmt::Display, str::FromStr};

use chrono::{DateTime, TimeZone, Utc};
use poe_common::Amount;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, types::Json, FromRow, Row, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value for {kind}: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

impl ConversionError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The key of the lease document guarding this order.
    pub fn lock_key(&self) -> String {
        format!("lock:{}", self.0)
    }
}

//--------------------------------------       OrderType       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// A collection: funds flow from the customer to the merchant.
    Deposit,
    /// A payout: funds flow from the merchant to the customer.
    Withdrawal,
}

impl Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderType::Deposit => write!(f, "DEPOSIT"),
            OrderType::Withdrawal => write!(f, "WITHDRAWAL"),
        }
    }
}

impl FromStr for OrderType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEPOSIT" => Ok(Self::Deposit),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            _ => Err(ConversionError::new("order type", s)),
        }
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The closed set of states a payment order can be in. The legal moves between them live in
/// [`crate::transitions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// The order has been created and the merchant's funds are frozen.
    Pending,
    /// The provider has accepted the order and is working on it.
    Processing,
    /// The provider reported a successful outcome. Frozen funds were made available.
    Success,
    /// The provider reported a failure. Frozen funds were released.
    Failed,
    /// The order was cancelled by the merchant, an operator or the risk process.
    Cancelled,
    /// The provider did not report an outcome in time.
    Timeout,
    /// Only part of the order amount was collected or paid out.
    PartialSuccess,
    /// The full (remaining) amount was refunded.
    Refunded,
    /// Part of the amount was refunded.
    PartialRefunded,
    /// A chargeback or dispute was opened against the order.
    Disputed,
    /// The dispute was closed.
    DisputeResolved,
    /// The risk engine blocked the order.
    RiskBlocked,
    /// The order is waiting on a human decision.
    ManualReview,
    /// The provider reversed a successful order.
    Reversed,
    /// The order was never picked up and aged out.
    Expired,
}

impl OrderStatusType {
    pub const ALL: [OrderStatusType; 15] = [
        OrderStatusType::Pending,
        OrderStatusType::Processing,
        OrderStatusType::Success,
        OrderStatusType::Failed,
        OrderStatusType::Cancelled,
        OrderStatusType::Timeout,
        OrderStatusType::PartialSuccess,
        OrderStatusType::Refunded,
        OrderStatusType::PartialRefunded,
        OrderStatusType::Disputed,
        OrderStatusType::DisputeResolved,
        OrderStatusType::RiskBlocked,
        OrderStatusType::ManualReview,
        OrderStatusType::Reversed,
        OrderStatusType::Expired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatusType::Pending => "PENDING",
            OrderStatusType::Processing => "PROCESSING",
            OrderStatusType::Success => "SUCCESS",
            OrderStatusType::Failed => "FAILED",
            OrderStatusType::Cancelled => "CANCELLED",
            OrderStatusType::Timeout => "TIMEOUT",
            OrderStatusType::PartialSuccess => "PARTIAL_SUCCESS",
            OrderStatusType::Refunded => "REFUNDED",
            OrderStatusType::PartialRefunded => "PARTIAL_REFUNDED",
            OrderStatusType::Disputed => "DISPUTED",
            OrderStatusType::DisputeResolved => "DISPUTE_RESOLVED",
            OrderStatusType::RiskBlocked => "RISK_BLOCKED",
            OrderStatusType::ManualReview => "MANUAL_REVIEW",
            OrderStatusType::Reversed => "REVERSED",
            OrderStatusType::Expired => "EXPIRED",
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Self::ALL
            .iter()
            .find(|status| status.as_str() == wanted)
            .copied()
            .ok_or_else(|| ConversionError::new("order status", s))
    }
}

//--------------------------------------    MerchantStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MerchantStatus {
    Active,
    Suspended,
    Closed,
}

impl Display for MerchantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MerchantStatus::Active => write!(f, "ACTIVE"),
            MerchantStatus::Suspended => write!(f, "SUSPENDED"),
            MerchantStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

impl FromStr for MerchantStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "SUSPENDED" => Ok(Self::Suspended),
            "CLOSED" => Ok(Self::Closed),
            _ => Err(ConversionError::new("merchant status", s)),
        }
    }
}

//--------------------------------------   Order sub-records   ---------------------------------------------------------
/// The payment provider handling the order. Opaque to the state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub name: String,
    /// The provider's own reference for the order, usually learnt from a webhook.
    pub reference: Option<String>,
}

impl Provider {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), reference: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Callback {
    pub notify_url: Option<String>,
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    /// Everything refunded on this order so far.
    pub total_refunded: Amount,
    /// The amount refunded by the most recent refund transition.
    pub last_amount: Amount,
    pub reason: Option<String>,
    pub refunded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispute {
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub opened_at: DateTime<Utc>,
    pub resolution: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskInfo {
    pub reason: Option<String>,
    pub score: Option<u32>,
    pub flagged_at: DateTime<Utc>,
}

/// One timestamp per lifecycle event. Only `created_at` and `status_updated_at` are always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTimestamps {
    pub created_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub timeout_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub disputed_at: Option<DateTime<Utc>>,
    pub dispute_resolved_at: Option<DateTime<Utc>>,
    pub risk_blocked_at: Option<DateTime<Utc>>,
    pub manual_review_at: Option<DateTime<Utc>>,
    pub status_updated_at: DateTime<Utc>,
}

impl OrderTimestamps {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            processing_started_at: None,
            paid_at: None,
            failed_at: None,
            cancelled_at: None,
            timeout_at: None,
            expired_at: None,
            refunded_at: None,
            disputed_at: None,
            dispute_resolved_at: None,
            risk_blocked_at: None,
            manual_review_at: None,
            status_updated_at: created_at,
        }
    }

    /// Records the time at which `status` was entered.
    pub fn stamp(&mut self, status: OrderStatusType, at: DateTime<Utc>) {
        use OrderStatusType::*;
        let slot = match status {
            Pending | Reversed => None,
            Processing => Some(&mut self.processing_started_at),
            Success | PartialSuccess => Some(&mut self.paid_at),
            Failed => Some(&mut self.failed_at),
            Cancelled => Some(&mut self.cancelled_at),
            Timeout => Some(&mut self.timeout_at),
            Expired => Some(&mut self.expired_at),
            Refunded | PartialRefunded => Some(&mut self.refunded_at),
            Disputed => Some(&mut self.disputed_at),
            DisputeResolved => Some(&mut self.dispute_resolved_at),
            RiskBlocked => Some(&mut self.risk_blocked_at),
            ManualReview => Some(&mut self.manual_review_at),
        };
        if let Some(slot) = slot {
            *slot = Some(at);
        }
        self.status_updated_at = at;
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub merchant_id: String,
    pub order_type: OrderType,
    pub amount: Amount,
    pub fee: Amount,
    pub currency: String,
    pub status: OrderStatusType,
    pub provider: Provider,
    pub customer: Customer,
    pub callback: Callback,
    /// True while the order amount is still held in the merchant's frozen balance.
    pub funds_frozen: bool,
    pub timestamps: OrderTimestamps,
    pub refund: Option<Refund>,
    pub dispute: Option<Dispute>,
    pub risk_info: Option<RiskInfo>,
    /// The payload of the most recent status transition.
    pub additional_data: Option<serde_json::Value>,
    /// The idempotency journal for this order, oldest first. Only populated by reads that ask for it.
    #[serde(default)]
    pub operations: Vec<OperationRecord>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn total_refunded(&self) -> Amount {
        self.refund.as_ref().map(|r| r.total_refunded).unwrap_or_default()
    }

    /// The part of the order amount that has not been refunded yet.
    pub fn refundable_amount(&self) -> Amount {
        self.amount - self.total_refunded()
    }

    pub fn with_operations(mut self, operations: Vec<OperationRecord>) -> Self {
        self.operations = operations;
        self
    }
}

impl<'r> FromRow<'r, SqliteRow> for Order {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let refund: Option<Json<Refund>> = row.try_get("refund")?;
        let dispute: Option<Json<Dispute>> = row.try_get("dispute")?;
        let risk_info: Option<Json<RiskInfo>> = row.try_get("risk_info")?;
        let additional_data: Option<Json<serde_json::Value>> = row.try_get("additional_data")?;
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            merchant_id: row.try_get("merchant_id")?,
            order_type: row.try_get("order_type")?,
            amount: row.try_get("amount")?,
            fee: row.try_get("fee")?,
            currency: row.try_get("currency")?,
            status: row.try_get("status")?,
            provider: Provider { name: row.try_get("provider_name")?, reference: row.try_get("provider_reference")? },
            customer: Customer { email: row.try_get("customer_email")?, phone: row.try_get("customer_phone")? },
            callback: Callback { notify_url: row.try_get("notify_url")?, return_url: row.try_get("return_url")? },
            funds_frozen: row.try_get("funds_frozen")?,
            timestamps: OrderTimestamps {
                created_at: row.try_get("created_at")?,
                processing_started_at: row.try_get("processing_started_at")?,
                paid_at: row.try_get("paid_at")?,
                failed_at: row.try_get("failed_at")?,
                cancelled_at: row.try_get("cancelled_at")?,
                timeout_at: row.try_get("timeout_at")?,
                expired_at: row.try_get("expired_at")?,
                refunded_at: row.try_get("refunded_at")?,
                disputed_at: row.try_get("disputed_at")?,
                dispute_resolved_at: row.try_get("dispute_resolved_at")?,
                risk_blocked_at: row.try_get("risk_blocked_at")?,
                manual_review_at: row.try_get("manual_review_at")?,
                status_updated_at: row.try_get("status_updated_at")?,
            },
            refund: refund.map(|j| j.0),
            dispute: dispute.map(|j| j.0),
            risk_info: risk_info.map(|j| j.0),
            additional_data: additional_data.map(|j| j.0),
            operations: Vec::new(),
            updated_at: row.try_get("updated_at")?,
        })
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// A fully resolved order, ready to be written by the backend. Built by the order creation flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub merchant_id: String,
    pub order_type: OrderType,
    pub amount: Amount,
    pub fee: Amount,
    pub currency: String,
    pub provider: Provider,
    pub customer: Customer,
    pub callback: Callback,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    MerchantBalance    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantBalance {
    pub available: Amount,
    pub frozen: Amount,
}

impl MerchantBalance {
    pub fn new(available: Amount, frozen: Amount) -> Self {
        Self { available, frozen }
    }

    pub fn is_consistent(&self) -> bool {
        !self.available.is_negative() && !self.frozen.is_negative()
    }
}

impl Display for MerchantBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "available: {}, frozen: {}", self.available, self.frozen)
    }
}

/// Per-merchant caps. `None` means the cap is not enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantLimits {
    pub daily_limit: Option<Amount>,
    pub monthly_limit: Option<Amount>,
    pub single_transaction_limit: Option<Amount>,
    pub min_transaction_amount: Option<Amount>,
}

impl MerchantLimits {
    pub fn with_daily_limit(mut self, limit: Amount) -> Self {
        self.daily_limit = Some(limit);
        self
    }

    pub fn with_monthly_limit(mut self, limit: Amount) -> Self {
        self.monthly_limit = Some(limit);
        self
    }

    pub fn with_single_transaction_limit(mut self, limit: Amount) -> Self {
        self.single_transaction_limit = Some(limit);
        self
    }

    pub fn with_min_transaction_amount(mut self, amount: Amount) -> Self {
        self.min_transaction_amount = Some(amount);
        self
    }
}

//--------------------------------------       Merchant        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merchant {
    pub id: i64,
    pub merchant_id: String,
    pub name: String,
    pub status: MerchantStatus,
    pub balance: MerchantBalance,
    pub limits: MerchantLimits,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Merchant {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            merchant_id: row.try_get("merchant_id")?,
            name: row.try_get("name")?,
            status: row.try_get("status")?,
            balance: MerchantBalance { available: row.try_get("available")?, frozen: row.try_get("frozen")? },
            limits: MerchantLimits {
                daily_limit: row.try_get("daily_limit")?,
                monthly_limit: row.try_get("monthly_limit")?,
                single_transaction_limit: row.try_get("single_transaction_limit")?,
                min_transaction_amount: row.try_get("min_transaction_amount")?,
            },
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMerchant {
    pub merchant_id: String,
    pub name: String,
    pub limits: MerchantLimits,
    /// Opening available balance, e.g. to fund payouts.
    pub available: Amount,
}

impl NewMerchant {
    pub fn new<S: Into<String>>(merchant_id: S, name: S) -> Self {
        Self { merchant_id: merchant_id.into(), name: name.into(), limits: MerchantLimits::default(), available: 0.into() }
    }

    pub fn with_limits(mut self, limits: MerchantLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_available(mut self, available: Amount) -> Self {
        self.available = available;
        self
    }
}

//--------------------------------------      Transaction      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub before: MerchantBalance,
    pub after: MerchantBalance,
}

/// The ledger mirror of an [`Order`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub order_id: OrderId,
    pub merchant_id: String,
    pub transaction_type: OrderType,
    pub status: OrderStatusType,
    pub amount: Amount,
    pub fee: Amount,
    pub currency: String,
    /// The cumulative effect of the order on the merchant's available balance.
    pub balance_change: Amount,
    pub balance_snapshot: BalanceSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for Transaction {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            order_id: row.try_get("order_id")?,
            merchant_id: row.try_get("merchant_id")?,
            transaction_type: row.try_get("transaction_type")?,
            status: row.try_get("status")?,
            amount: row.try_get("amount")?,
            fee: row.try_get("fee")?,
            currency: row.try_get("currency")?,
            balance_change: row.try_get("balance_change")?,
            balance_snapshot: BalanceSnapshot {
                before: MerchantBalance {
                    available: row.try_get("before_available")?,
                    frozen: row.try_get("before_frozen")?,
                },
                after: MerchantBalance {
                    available: row.try_get("after_available")?,
                    frozen: row.try_get("after_frozen")?,
                },
            },
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

//--------------------------------------    OperationRecord    ---------------------------------------------------------
/// An entry in an order's idempotency journal.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: i64,
    pub order_id: OrderId,
    pub operation_id: String,
    pub from_status: OrderStatusType,
    pub to_status: OrderStatusType,
    pub executed_by: String,
    pub executed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOperationRecord {
    pub order_id: OrderId,
    pub operation_id: String,
    pub from_status: OrderStatusType,
    pub to_status: OrderStatusType,
    pub executed_by: String,
    pub executed_at: DateTime<Utc>,
}

//--------------------------------------       LockLease       ---------------------------------------------------------
/// A time-bounded exclusive claim on the right to mutate one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockLease {
    pub key: String,
    pub operation_id: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LockLease {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

impl<'r> FromRow<'r, SqliteRow> for LockLease {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let acquired_at: i64 = row.try_get("acquired_at")?;
        let expires_at: i64 = row.try_get("expires_at")?;
        let to_datetime = |column: &str, millis: i64| {
            Utc.timestamp_millis_opt(millis).single().ok_or_else(|| sqlx::Error::ColumnDecode {
                index: column.to_string(),
                source: format!("{millis} is not a valid timestamp").into(),
            })
        };
        Ok(Self {
            key: row.try_get("lock_key")?,
            operation_id: row.try_get("operation_id")?,
            acquired_at: to_datetime("acquired_at", acquired_at)?,
            expires_at: to_datetime("expires_at", expires_at)?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_names_round_trip() {
        for status in OrderStatusType::ALL {
            assert_eq!(status.as_str().parse::<OrderStatusType>().unwrap(), status);
        }
        assert_eq!("partial_refunded".parse::<OrderStatusType>().unwrap(), OrderStatusType::PartialRefunded);
        assert!("PAID".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn status_serializes_in_upper_snake_case() {
        let json = serde_json::to_string(&OrderStatusType::DisputeResolved).unwrap();
        assert_eq!(json, "\"DISPUTE_RESOLVED\"");
    }

    #[test]
    fn lock_key_is_prefixed() {
        assert_eq!(OrderId::from("ORD-1").lock_key(), "lock:ORD-1");
    }

    #[test]
    fn stamping_sets_event_time() {
        let created = Utc::now();
        let mut ts = OrderTimestamps::new(created);
        let later = created + chrono::Duration::seconds(5);
        ts.stamp(OrderStatusType::Processing, later);
        assert_eq!(ts.processing_started_at, Some(later));
        assert_eq!(ts.status_updated_at, later);
        assert_eq!(ts.created_at, created);
        ts.stamp(OrderStatusType::Pending, later);
        assert_eq!(ts.paid_at, None);
    }
}
