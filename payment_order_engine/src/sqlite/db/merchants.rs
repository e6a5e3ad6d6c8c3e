use chrono::{DateTime, Utc};
use log::{debug, trace};
use poe_common::Amount;
use sqlx::SqliteConnection;

use super::{is_check_violation, is_unique_violation};
use crate::{
    db_types::{Merchant, MerchantBalance, MerchantStatus, NewMerchant, OrderStatusType, OrderType},
    traits::MerchantError,
};

pub async fn insert_merchant(
    merchant: NewMerchant,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Merchant, MerchantError> {
    let merchant_id = merchant.merchant_id.clone();
    let result = sqlx::query_as(
        r#"
            INSERT INTO merchants (
                merchant_id,
                name,
                status,
                available,
                frozen,
                daily_limit,
                monthly_limit,
                single_transaction_limit,
                min_transaction_amount,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, 0, $5, $6, $7, $8, $9, $9)
            RETURNING *;
        "#,
    )
    .bind(merchant.merchant_id)
    .bind(merchant.name)
    .bind(MerchantStatus::Active)
    .bind(merchant.available)
    .bind(merchant.limits.daily_limit)
    .bind(merchant.limits.monthly_limit)
    .bind(merchant.limits.single_transaction_limit)
    .bind(merchant.limits.min_transaction_amount)
    .bind(now)
    .fetch_one(conn)
    .await;
    match result {
        Ok(merchant) => {
            debug!("🗃️ Merchant {merchant_id} created");
            Ok(merchant)
        },
        Err(e) if is_unique_violation(&e) => Err(MerchantError::MerchantAlreadyExists(merchant_id)),
        Err(e) if is_check_violation(&e) => {
            Err(MerchantError::InvalidAmount(format!("Opening balance for {merchant_id} cannot be negative")))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_merchant(merchant_id: &str, conn: &mut SqliteConnection) -> Result<Option<Merchant>, sqlx::Error> {
    let merchant = sqlx::query_as("SELECT * FROM merchants WHERE merchant_id = $1")
        .bind(merchant_id)
        .fetch_optional(conn)
        .await?;
    Ok(merchant)
}

pub async fn update_status(
    merchant_id: &str,
    status: MerchantStatus,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Merchant>, sqlx::Error> {
    let merchant = sqlx::query_as("UPDATE merchants SET status = $1, updated_at = $2 WHERE merchant_id = $3 RETURNING *")
        .bind(status)
        .bind(now)
        .bind(merchant_id)
        .fetch_optional(conn)
        .await?;
    Ok(merchant)
}

/// `frozen += amount` for an `ACTIVE` merchant, as one conditional update.
pub async fn freeze_funds(
    merchant_id: &str,
    amount: Amount,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<MerchantBalance, MerchantError> {
    let result: Result<Option<(i64, i64)>, sqlx::Error> = sqlx::query_as(
        r#"
            UPDATE merchants SET frozen = frozen + $1, updated_at = $2
            WHERE merchant_id = $3 AND status = 'ACTIVE'
            RETURNING available, frozen;
        "#,
    )
    .bind(amount)
    .bind(now)
    .bind(merchant_id)
    .fetch_optional(&mut *conn)
    .await;
    match result {
        Ok(Some((available, frozen))) => {
            trace!("🗃️ Froze {amount} for merchant {merchant_id}. Frozen is now {frozen}");
            Ok(MerchantBalance::new(available.into(), frozen.into()))
        },
        // Either there is no such merchant, or it is not active. Find out which.
        Ok(None) => match fetch_merchant(merchant_id, conn).await? {
            None => Err(MerchantError::MerchantNotFound(merchant_id.to_string())),
            Some(m) => Err(MerchantError::MerchantNotActive { merchant_id: m.merchant_id, status: m.status }),
        },
        Err(e) if is_check_violation(&e) => Err(MerchantError::InsufficientBalance(merchant_id.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// Applies both deltas in one statement. The CHECK constraint on the table rejects the whole update if either balance
/// would go negative.
pub async fn adjust_balance(
    merchant_id: &str,
    available_delta: Amount,
    frozen_delta: Amount,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<MerchantBalance, MerchantError> {
    let result: Result<Option<(i64, i64)>, sqlx::Error> = sqlx::query_as(
        r#"
            UPDATE merchants SET available = available + $1, frozen = frozen + $2, updated_at = $3
            WHERE merchant_id = $4
            RETURNING available, frozen;
        "#,
    )
    .bind(available_delta)
    .bind(frozen_delta)
    .bind(now)
    .bind(merchant_id)
    .fetch_optional(conn)
    .await;
    match result {
        Ok(Some((available, frozen))) => {
            trace!(
                "🗃️ Merchant {merchant_id} balance adjusted by {available_delta}/{frozen_delta}. Now {available}/{frozen}"
            );
            Ok(MerchantBalance::new(available.into(), frozen.into()))
        },
        Ok(None) => Err(MerchantError::MerchantNotFound(merchant_id.to_string())),
        Err(e) if is_check_violation(&e) => Err(MerchantError::InsufficientBalance(merchant_id.to_string())),
        Err(e) => Err(e.into()),
    }
}

pub async fn order_volume_since(
    merchant_id: &str,
    order_type: OrderType,
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Amount, sqlx::Error> {
    let (total,): (i64,) = sqlx::query_as(
        r#"
            SELECT COALESCE(SUM(amount), 0) FROM transactions
            WHERE merchant_id = $1
              AND transaction_type = $2
              AND status IN ($3, $4)
              AND created_at >= $5;
        "#,
    )
    .bind(merchant_id)
    .bind(order_type)
    .bind(OrderStatusType::Pending)
    .bind(OrderStatusType::Success)
    .bind(since)
    .fetch_one(conn)
    .await?;
    Ok(Amount::from(total))
}
