//! The idempotency journal.
use sqlx::SqliteConnection;

use super::is_unique_violation;
use crate::{
    db_types::{NewOperationRecord, OperationRecord, OrderId},
    traits::PaymentOrderDbError,
};

/// Appends an entry to the order's journal. The `(order_id, operation_id)` pair is unique, so a second append of the
/// same operation fails with [`PaymentOrderDbError::DuplicateOperation`].
pub async fn insert_operation(
    op: NewOperationRecord,
    conn: &mut SqliteConnection,
) -> Result<OperationRecord, PaymentOrderDbError> {
    let result = sqlx::query_as(
        r#"
            INSERT INTO order_operations (order_id, operation_id, from_status, to_status, executed_by, executed_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(op.order_id.as_str())
    .bind(&op.operation_id)
    .bind(op.from_status)
    .bind(op.to_status)
    .bind(&op.executed_by)
    .bind(op.executed_at)
    .fetch_one(conn)
    .await;
    match result {
        Ok(record) => Ok(record),
        Err(e) if is_unique_violation(&e) => {
            Err(PaymentOrderDbError::DuplicateOperation { order_id: op.order_id, operation_id: op.operation_id })
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_operation(
    order_id: &OrderId,
    operation_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<OperationRecord>, sqlx::Error> {
    let record = sqlx::query_as("SELECT * FROM order_operations WHERE order_id = $1 AND operation_id = $2")
        .bind(order_id.as_str())
        .bind(operation_id)
        .fetch_optional(conn)
        .await?;
    Ok(record)
}

/// The order's journal, oldest entry first.
pub async fn fetch_operations(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OperationRecord>, sqlx::Error> {
    let records = sqlx::query_as("SELECT * FROM order_operations WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id.as_str())
        .fetch_all(conn)
        .await?;
    Ok(records)
}
