use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::db_types::LockLease;

#[derive(Debug, Clone, Error)]
pub enum LockError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for LockError {
    fn from(e: sqlx::Error) -> Self {
        LockError::DatabaseError(e.to_string())
    }
}

/// Storage for per-order leases.
///
/// Every method is a single atomic statement against the store. Backends never read the clock themselves: callers pass
/// `now` in, which keeps expiry decisions in one place and makes them testable.
#[allow(async_fn_in_trait)]
pub trait LockManagement {
    /// Claims the lease on `key` for `operation_id` until `expires_at`.
    ///
    /// The claim succeeds if no lease exists, the existing lease expired before `now`, or the existing lease is held by
    /// the same `operation_id` (in which case its expiry is left alone). Returns the lease as stored on success and
    /// `None` if another operation holds a live lease.
    async fn try_acquire_lease(
        &self,
        key: &str,
        operation_id: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Option<LockLease>, LockError>;

    /// Deletes the lease on `key` if, and only if, it is held by `operation_id`. Returns whether a lease was deleted.
    async fn release_lease(&self, key: &str, operation_id: &str) -> Result<bool, LockError>;

    async fn fetch_lease(&self, key: &str) -> Result<Option<LockLease>, LockError>;

    /// Deletes every lease that expired before `now`, returning the number removed.
    async fn sweep_expired_leases(&self, now: DateTime<Utc>) -> Result<u64, LockError>;
}
