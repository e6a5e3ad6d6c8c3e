//! Lease storage. Each function is one statement; callers run it inside a transaction and commit.
use chrono::{DateTime, Utc};
use log::trace;
use sqlx::SqliteConnection;

use crate::db_types::LockLease;

/// Claims `key` for `operation_id` with a single conditional upsert.
///
/// A row is written (and returned) when the key is free, when the existing lease expired before `now`, or when the
/// existing lease already belongs to `operation_id`. In the last case a live lease keeps its original times.
/// Otherwise the `DO UPDATE` is skipped, nothing is returned, and the lease is still held by someone else.
pub async fn try_acquire(
    key: &str,
    operation_id: &str,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<LockLease>, sqlx::Error> {
    let lease: Option<LockLease> = sqlx::query_as(
        r#"
            INSERT INTO order_locks (lock_key, operation_id, acquired_at, expires_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (lock_key) DO UPDATE SET
                operation_id = excluded.operation_id,
                acquired_at = CASE
                    WHEN order_locks.expires_at < excluded.acquired_at THEN excluded.acquired_at
                    ELSE order_locks.acquired_at
                END,
                expires_at = CASE
                    WHEN order_locks.expires_at < excluded.acquired_at THEN excluded.expires_at
                    ELSE order_locks.expires_at
                END
            WHERE order_locks.expires_at < excluded.acquired_at OR order_locks.operation_id = excluded.operation_id
            RETURNING *;
        "#,
    )
    .bind(key)
    .bind(operation_id)
    .bind(now.timestamp_millis())
    .bind(expires_at.timestamp_millis())
    .fetch_optional(conn)
    .await?;
    trace!("🔒️ Lease on {key} for {operation_id}: {}", if lease.is_some() { "acquired" } else { "held elsewhere" });
    Ok(lease)
}

/// Deletes the lease only if `operation_id` holds it.
pub async fn release(key: &str, operation_id: &str, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM order_locks WHERE lock_key = $1 AND operation_id = $2")
        .bind(key)
        .bind(operation_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn fetch(key: &str, conn: &mut SqliteConnection) -> Result<Option<LockLease>, sqlx::Error> {
    let lease = sqlx::query_as("SELECT * FROM order_locks WHERE lock_key = $1").bind(key).fetch_optional(conn).await?;
    Ok(lease)
}

pub async fn sweep_expired(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM order_locks WHERE expires_at < $1").bind(now.timestamp_millis()).execute(conn).await?;
    Ok(result.rows_affected())
}
