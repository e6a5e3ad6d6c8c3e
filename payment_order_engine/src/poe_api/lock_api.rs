//! Per-order mutual exclusion with time-bounded leases.
//!
//! A lease on `lock:<order_id>` gives one operation the exclusive right to mutate the order until it is released or
//! expires. Acquisition is a single non-blocking attempt: the caller learns immediately whether it holds the lease and
//! is expected to fail fast if it does not. Expired leases are reclaimed by the next acquirer, or removed in bulk by
//! [`LockManager::sweep_expired`].
//!
//! Leases carry no fencing token. A holder that outlives its lease can still write after another operation has taken
//! the order over; the journal and the status precondition on writes catch most, but not all, of those cases.
use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{LockLease, OrderId},
    traits::{LockError, LockManagement},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockConfig {
    /// How long a lease is valid for once acquired.
    pub ttl: Duration,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { ttl: Duration::seconds(30) }
    }
}

impl LockConfig {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { ttl }
    }
}

pub struct LockManager<B> {
    db: B,
    config: LockConfig,
}

impl<B> Debug for LockManager<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LockManager (ttl: {}s)", self.config.ttl.num_seconds())
    }
}

impl<B> LockManager<B> {
    pub fn new(db: B, config: LockConfig) -> Self {
        Self { db, config }
    }

    pub fn config(&self) -> &LockConfig {
        &self.config
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> LockManager<B>
where B: LockManagement
{
    /// Tries once to take the lease on `order_id` for `operation_id`.
    ///
    /// Returns `None` if another operation holds a live lease. Asking again with the operation id that already holds
    /// the lease succeeds without extending it.
    pub async fn acquire(&self, order_id: &OrderId, operation_id: &str) -> Result<Option<LockLease>, LockError> {
        let now = Utc::now();
        let expires_at = now + self.config.ttl;
        let key = order_id.lock_key();
        let lease = self.db.try_acquire_lease(&key, operation_id, now, expires_at).await?;
        match &lease {
            Some(l) => trace!("🔒️ {operation_id} holds {key} until {}", l.expires_at),
            None => debug!("🔒️ {operation_id} could not take {key}. It is held by another operation."),
        }
        Ok(lease)
    }

    /// Gives the lease back. Only the holder can release it; a lease that has since been reclaimed by another
    /// operation is left alone. Returns whether a lease was removed.
    pub async fn release(&self, order_id: &OrderId, operation_id: &str) -> Result<bool, LockError> {
        let key = order_id.lock_key();
        let released = self.db.release_lease(&key, operation_id).await?;
        if released {
            trace!("🔒️ {operation_id} released {key}");
        } else {
            debug!("🔒️ {operation_id} no longer held {key} when releasing it");
        }
        Ok(released)
    }

    pub async fn current_lease(&self, order_id: &OrderId) -> Result<Option<LockLease>, LockError> {
        self.db.fetch_lease(&order_id.lock_key()).await
    }

    /// Removes every lease that has expired. Returns the number removed.
    pub async fn sweep_expired(&self) -> Result<u64, LockError> {
        let count = self.db.sweep_expired_leases(Utc::now()).await?;
        if count > 0 {
            info!("🔒️ Swept {count} expired leases");
        }
        Ok(count)
    }
}
