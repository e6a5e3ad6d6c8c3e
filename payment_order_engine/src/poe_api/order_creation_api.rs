use std::fmt::Debug;

use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};
use log::*;
use poe_common::Amount;

use crate::{
    db_types::{BalanceSnapshot, Merchant, MerchantBalance, MerchantLimits, NewOrder, OrderType},
    events::{EventProducers, OrderCreatedEvent},
    helpers::generate_order_id,
    order_objects::{CreateOrderRequest, CreatedOrder},
    poe_api::errors::{LimitKind, OrderFlowError},
    traits::PaymentOrderDatabase,
};

/// `OrderCreationApi` opens new payment orders.
///
/// Creation is a short saga rather than a single transaction:
/// 1. freeze the order amount on the merchant's account (only while the merchant is `ACTIVE`),
/// 2. check the merchant's daily and monthly deposit volume limits,
/// 3. insert the order and its transaction.
///
/// If step 2 or 3 fails, the freeze is undone before the error is returned. Checks that need no compensation (amount
/// sanity, minimum and single transaction limits) run before anything is written.
pub struct OrderCreationApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderCreationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderCreationApi")
    }
}

impl<B> OrderCreationApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderCreationApi<B>
where B: PaymentOrderDatabase
{
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
        merchant_id: &str,
    ) -> Result<CreatedOrder, OrderFlowError> {
        validate_request(&request)?;
        let merchant = self
            .db
            .fetch_merchant(merchant_id)
            .await?
            .ok_or_else(|| OrderFlowError::MerchantNotFound(merchant_id.to_string()))?;
        check_amount_limits(&merchant.limits, request.amount)?;

        let amount = request.amount;
        let after = self.db.freeze_funds(merchant_id, amount).await?;
        let snapshot = BalanceSnapshot { before: MerchantBalance::new(after.available, after.frozen - amount), after };
        trace!("🧊️ Froze {amount} for merchant {merchant_id}. Balance is now {after}");

        if let Err(e) = self.check_volume_limits(&merchant, amount).await {
            return Err(self.compensate(merchant_id, amount, e).await);
        }

        let order_id = request.order_id.unwrap_or_else(generate_order_id);
        let new_order = NewOrder {
            order_id: order_id.clone(),
            merchant_id: merchant_id.to_string(),
            order_type: request.order_type,
            amount,
            fee: request.fee,
            currency: request.currency,
            provider: request.provider,
            customer: request.customer,
            callback: request.callback,
            created_at: Utc::now(),
        };
        match self.db.insert_order(new_order, snapshot).await {
            Ok(created) => {
                info!(
                    "🧊️ Order {order_id} created for merchant {merchant_id}: {} {amount} {}",
                    created.order.order_type, created.order.currency
                );
                self.producers.publish_order_created(OrderCreatedEvent::new(created.order.clone())).await;
                Ok(created)
            },
            Err(e) => Err(self.compensate(merchant_id, amount, e.into()).await),
        }
    }

    /// The daily and monthly limits cap the merchant's deposit volume. Every new order, whatever its type, is counted
    /// against that volume.
    async fn check_volume_limits(&self, merchant: &Merchant, amount: Amount) -> Result<(), OrderFlowError> {
        let now = Local::now();
        let limits = &merchant.limits;
        if let Some(limit) = limits.daily_limit {
            let used =
                self.db.order_volume_since(&merchant.merchant_id, OrderType::Deposit, start_of_day(now)).await?;
            check_volume(LimitKind::Daily, limit, used, amount)?;
        }
        if let Some(limit) = limits.monthly_limit {
            let used =
                self.db.order_volume_since(&merchant.merchant_id, OrderType::Deposit, start_of_month(now)).await?;
            check_volume(LimitKind::Monthly, limit, used, amount)?;
        }
        Ok(())
    }

    /// Undoes the freeze from step 1 and returns the error the caller should see.
    async fn compensate(&self, merchant_id: &str, amount: Amount, original: OrderFlowError) -> OrderFlowError {
        match self.db.unfreeze_funds(merchant_id, amount).await {
            Ok(balance) => {
                warn!("🧊️ Order creation for {merchant_id} failed ({original}). Released {amount}. Balance: {balance}");
                original
            },
            Err(e) => {
                error!(
                    "🧊️ Order creation for {merchant_id} failed ({original}) and the {amount} frozen for it could not be \
                     released: {e}. The merchant's frozen balance is now too high and must be corrected by hand."
                );
                OrderFlowError::CompensationFailed { original: Box::new(original), compensation: e.to_string() }
            },
        }
    }
}

fn validate_request(request: &CreateOrderRequest) -> Result<(), OrderFlowError> {
    if !request.amount.is_positive() {
        return Err(OrderFlowError::InvalidRequest(format!("Order amount must be positive, not {}", request.amount)));
    }
    if request.fee.is_negative() {
        return Err(OrderFlowError::InvalidRequest(format!("Order fee cannot be negative ({})", request.fee)));
    }
    if request.currency.trim().is_empty() {
        return Err(OrderFlowError::InvalidRequest("Order currency is missing".into()));
    }
    if request.provider.name.trim().is_empty() {
        return Err(OrderFlowError::InvalidRequest("Order provider is missing".into()));
    }
    if request.order_id.as_ref().is_some_and(|id| id.as_str().trim().is_empty()) {
        return Err(OrderFlowError::InvalidRequest("Order id cannot be blank".into()));
    }
    Ok(())
}

fn check_amount_limits(limits: &MerchantLimits, amount: Amount) -> Result<(), OrderFlowError> {
    if let Some(min) = limits.min_transaction_amount {
        if amount < min {
            return Err(OrderFlowError::LimitExceeded { kind: LimitKind::MinimumAmount, limit: min, attempted: amount });
        }
    }
    if let Some(max) = limits.single_transaction_limit {
        if amount > max {
            return Err(OrderFlowError::LimitExceeded {
                kind: LimitKind::SingleTransaction,
                limit: max,
                attempted: amount,
            });
        }
    }
    Ok(())
}

fn check_volume(kind: LimitKind, limit: Amount, used: Amount, amount: Amount) -> Result<(), OrderFlowError> {
    let attempted = used + amount;
    if attempted > limit {
        debug!("🧊️ {kind} limit of {limit} would be exceeded: {used} used, {amount} requested");
        return Err(OrderFlowError::LimitExceeded { kind, limit, attempted });
    }
    Ok(())
}

/// The first instant of `date` in local time, in UTC.
fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    // A DST change can skip local midnight; use the first hour that does exist.
    (0..3)
        .filter_map(|h| date.and_hms_opt(h, 0, 0))
        .find_map(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)))
}

fn start_of_day(now: DateTime<Local>) -> DateTime<Utc> {
    local_midnight(now.date_naive())
}

fn start_of_month(now: DateTime<Local>) -> DateTime<Utc> {
    let date = now.date_naive();
    local_midnight(date.with_day(1).unwrap_or(date))
}
