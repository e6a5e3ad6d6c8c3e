use chrono::{DateTime, Utc};
use log::trace;
use poe_common::Amount;
use sqlx::SqliteConnection;

use crate::db_types::{BalanceSnapshot, Order, OrderId, OrderStatusType, Transaction};

/// Creates the ledger row mirroring `order`. At creation the order has not yet changed the available balance, so
/// `balance_change` starts at zero.
pub async fn insert_transaction(
    order: &Order,
    snapshot: BalanceSnapshot,
    conn: &mut SqliteConnection,
) -> Result<Transaction, sqlx::Error> {
    let tx = sqlx::query_as(
        r#"
            INSERT INTO transactions (
                order_id,
                merchant_id,
                transaction_type,
                status,
                amount,
                fee,
                currency,
                balance_change,
                before_available,
                before_frozen,
                after_available,
                after_frozen,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8, $9, $10, $11, $12, $12)
            RETURNING *;
        "#,
    )
    .bind(order.order_id.as_str())
    .bind(&order.merchant_id)
    .bind(order.order_type)
    .bind(order.status)
    .bind(order.amount)
    .bind(order.fee)
    .bind(&order.currency)
    .bind(snapshot.before.available)
    .bind(snapshot.before.frozen)
    .bind(snapshot.after.available)
    .bind(snapshot.after.frozen)
    .bind(order.timestamps.created_at)
    .fetch_one(conn)
    .await?;
    trace!("🗃️ Transaction for order [{}] inserted", order.order_id);
    Ok(tx)
}

pub async fn fetch_transaction(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let tx = sqlx::query_as("SELECT * FROM transactions WHERE order_id = $1")
        .bind(order_id.as_str())
        .fetch_optional(conn)
        .await?;
    Ok(tx)
}

/// Moves the transaction to `status`, adds `balance_delta` to its cumulative balance change and, when the transition
/// touched the merchant balance, replaces the snapshot.
pub async fn update_transaction(
    order_id: &OrderId,
    status: OrderStatusType,
    balance_delta: Amount,
    snapshot: Option<BalanceSnapshot>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Transaction>, sqlx::Error> {
    let tx = sqlx::query_as(
        r#"
            UPDATE transactions SET
                status = $1,
                balance_change = balance_change + $2,
                before_available = COALESCE($3, before_available),
                before_frozen = COALESCE($4, before_frozen),
                after_available = COALESCE($5, after_available),
                after_frozen = COALESCE($6, after_frozen),
                updated_at = $7
            WHERE order_id = $8
            RETURNING *;
        "#,
    )
    .bind(status)
    .bind(balance_delta)
    .bind(snapshot.map(|s| s.before.available))
    .bind(snapshot.map(|s| s.before.frozen))
    .bind(snapshot.map(|s| s.after.available))
    .bind(snapshot.map(|s| s.after.frozen))
    .bind(now)
    .bind(order_id.as_str())
    .fetch_optional(conn)
    .await?;
    Ok(tx)
}
