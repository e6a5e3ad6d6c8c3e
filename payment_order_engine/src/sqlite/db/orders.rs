use log::{debug, trace};
use sqlx::{types::Json, QueryBuilder, SqliteConnection};

use super::is_unique_violation;
use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    order_objects::OrderQueryFilter,
    traits::PaymentOrderDbError,
};

/// Inserts a new `PENDING` order with its funds marked as frozen. This is not atomic with anything else; embed the call
/// in a transaction and pass `&mut *tx` when it has to be.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, PaymentOrderDbError> {
    let order_id = order.order_id.clone();
    let result = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_id,
                merchant_id,
                order_type,
                amount,
                fee,
                currency,
                status,
                provider_name,
                provider_reference,
                customer_email,
                customer_phone,
                notify_url,
                return_url,
                funds_frozen,
                created_at,
                status_updated_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 1, $14, $14, $14)
            RETURNING *;
        "#,
    )
    .bind(order.order_id)
    .bind(order.merchant_id)
    .bind(order.order_type)
    .bind(order.amount)
    .bind(order.fee)
    .bind(order.currency)
    .bind(OrderStatusType::Pending)
    .bind(order.provider.name)
    .bind(order.provider.reference)
    .bind(order.customer.email)
    .bind(order.customer.phone)
    .bind(order.callback.notify_url)
    .bind(order.callback.return_url)
    .bind(order.created_at)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => {
            debug!("🗃️ Order [{order_id}] inserted");
            Ok(order)
        },
        Err(e) if is_unique_violation(&e) => Err(PaymentOrderDbError::OrderAlreadyExists(order_id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order(order_id: &OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order =
        sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await?;
    Ok(order)
}

/// Writes the mutable state of `order`, provided the stored order is still in `from_status`.
///
/// Returns `None` if the order does not exist or has moved on, in which case nothing was written.
pub async fn update_order_state(
    order: &Order,
    from_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let ts = &order.timestamps;
    let updated = sqlx::query_as(
        r#"
            UPDATE orders SET
                status = $1,
                provider_reference = $2,
                funds_frozen = $3,
                processing_started_at = $4,
                paid_at = $5,
                failed_at = $6,
                cancelled_at = $7,
                timeout_at = $8,
                expired_at = $9,
                refunded_at = $10,
                disputed_at = $11,
                dispute_resolved_at = $12,
                risk_blocked_at = $13,
                manual_review_at = $14,
                status_updated_at = $15,
                refund = $16,
                dispute = $17,
                risk_info = $18,
                additional_data = $19,
                updated_at = $20
            WHERE order_id = $21 AND status = $22
            RETURNING *;
        "#,
    )
    .bind(order.status)
    .bind(order.provider.reference.as_deref())
    .bind(order.funds_frozen)
    .bind(ts.processing_started_at)
    .bind(ts.paid_at)
    .bind(ts.failed_at)
    .bind(ts.cancelled_at)
    .bind(ts.timeout_at)
    .bind(ts.expired_at)
    .bind(ts.refunded_at)
    .bind(ts.disputed_at)
    .bind(ts.dispute_resolved_at)
    .bind(ts.risk_blocked_at)
    .bind(ts.manual_review_at)
    .bind(ts.status_updated_at)
    .bind(order.refund.as_ref().map(Json))
    .bind(order.dispute.as_ref().map(Json))
    .bind(order.risk_info.as_ref().map(Json))
    .bind(order.additional_data.as_ref().map(Json))
    .bind(order.updated_at)
    .bind(order.order_id.as_str())
    .bind(from_status)
    .fetch_optional(conn)
    .await?;
    Ok(updated)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(merchant_id) = query.merchant_id {
        where_clause.push("merchant_id = ");
        where_clause.push_bind_unseparated(merchant_id);
    }
    if let Some(order_type) = query.order_type {
        where_clause.push("order_type = ");
        where_clause.push_bind_unseparated(order_type);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        // Status names come from a closed enum, so they can be inlined.
        let status_clause = statuses.iter().map(|s| format!("'{}'", s.as_str())).collect::<Vec<_>>().join(",");
        where_clause.push(format!("status IN ({status_clause})"));
    }
    if let Some(before) = query.created_before {
        where_clause.push("created_at < ");
        where_clause.push_bind_unseparated(before);
    }
    if let Some(before) = query.processing_started_before {
        where_clause.push("processing_started_at < ");
        where_clause.push_bind_unseparated(before);
    }
    builder.push(" ORDER BY created_at ASC");
    if let Some(limit) = query.limit {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
    }

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}
