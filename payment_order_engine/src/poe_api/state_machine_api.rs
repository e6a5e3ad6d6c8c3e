use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{NewOperationRecord, OperationRecord, Order, OrderId, OrderStatusType},
    events::{EventProducers, OrderStatusChangedEvent},
    helpers::{derive_operation_id, sweep_operation_id},
    ledger::balance_effect,
    order_objects::{
        BatchUpdateResult,
        ExpiryResult,
        OrderQueryFilter,
        StateMachineInfo,
        StatusHistory,
        StatusUpdateRequest,
        StatusUpdateResult,
        TransitionData,
    },
    poe_api::{
        errors::OrderFlowError,
        lock_api::{LockConfig, LockManager},
    },
    traits::{AppliedTransition, PaymentOrderDatabase, PaymentOrderDbError},
    transitions::{self, transitioned_order, validate_transition},
};

pub const DEFAULT_EXECUTOR: &str = "system";
pub const EXPIRY_SWEEPER: &str = "system:expiry-sweeper";

/// `OrderStateMachine` is the only way to change the status of an existing order.
///
/// Every update runs the same protocol:
/// 1. take the order's lease, failing fast with [`OrderFlowError::LockContention`] if someone else holds it,
/// 2. look the operation id up in the order's journal and, if it is there, report the recorded outcome without doing
///    anything else,
/// 3. load the order and validate the move against the lifecycle graph and its guards,
/// 4. persist the journal entry, balance effect, order and transaction as one unit,
/// 5. give the lease back, whatever happened in steps 2 to 4.
pub struct OrderStateMachine<B> {
    db: B,
    locks: LockManager<B>,
    producers: EventProducers,
}

impl<B> Debug for OrderStateMachine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderStateMachine ({:?})", self.locks)
    }
}

impl<B: Clone> OrderStateMachine<B> {
    pub fn new(db: B, lock_config: LockConfig, producers: EventProducers) -> Self {
        let locks = LockManager::new(db.clone(), lock_config);
        Self { db, locks, producers }
    }
}

impl<B> OrderStateMachine<B> {
    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }

    pub fn locks(&self) -> &LockManager<B> {
        &self.locks
    }

    /// A read-only description of the lifecycle graph.
    pub fn state_machine_info(&self) -> StateMachineInfo {
        transitions::state_machine_info()
    }
}

impl<B> OrderStateMachine<B>
where B: PaymentOrderDatabase
{
    /// Moves an order to a new status.
    ///
    /// When the request carries no operation id, one is derived from the order id, the target status and the payload,
    /// so retries of the same update are recognised as replays. A replay returns `replayed = true` and the order as it
    /// is now.
    pub async fn update_status(&self, request: StatusUpdateRequest) -> Result<StatusUpdateResult, OrderFlowError> {
        let StatusUpdateRequest { order_id, to_status, data, operation_id, executed_by } = request;
        let operation_id = operation_id.unwrap_or_else(|| derive_operation_id(&order_id, to_status, &data));
        let executed_by = executed_by.unwrap_or_else(|| DEFAULT_EXECUTOR.to_string());
        trace!("🔄️ {executed_by} asks to move {order_id} to {to_status} ({operation_id})");

        if self.locks.acquire(&order_id, &operation_id).await?.is_none() {
            return Err(OrderFlowError::LockContention(order_id));
        }
        let result = self.update_status_locked(&order_id, to_status, &data, &operation_id, &executed_by).await;
        if let Err(e) = self.locks.release(&order_id, &operation_id).await {
            warn!("🔄️ Could not release the lease on {order_id} for {operation_id}: {e}. It will expire on its own.");
        }

        let (result, old_status) = result?;
        if !result.replayed {
            info!("🔄️ Order {order_id} moved from {old_status} to {to_status} by {executed_by}");
            let event = OrderStatusChangedEvent::new(old_status, result.order.clone(), result.operation_id.clone());
            self.producers.publish_status_changed(event).await;
        }
        Ok(result)
    }

    /// Steps 2 to 4 of the protocol. Must only be called while holding the lease.
    async fn update_status_locked(
        &self,
        order_id: &OrderId,
        to_status: OrderStatusType,
        data: &TransitionData,
        operation_id: &str,
        executed_by: &str,
    ) -> Result<(StatusUpdateResult, OrderStatusType), OrderFlowError> {
        if let Some(record) = self.db.fetch_operation(order_id, operation_id).await? {
            return self.replay(order_id, record).await;
        }
        let order = self.db.fetch_order(order_id).await?.ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let from = order.status;
        let validation = validate_transition(from, to_status, &order, data);
        if !validation.valid {
            let reason = validation.reason.unwrap_or_default();
            debug!("🔄️ Rejected move of {order_id} from {from} to {to_status}. {reason}");
            return Err(OrderFlowError::InvalidTransition { from, to: to_status, reason });
        }

        let now = Utc::now();
        let effect = balance_effect(&order, to_status, data);
        let transition = AppliedTransition {
            order: transitioned_order(&order, to_status, data, now),
            from_status: from,
            effect,
            operation: NewOperationRecord {
                order_id: order_id.clone(),
                operation_id: operation_id.to_string(),
                from_status: from,
                to_status,
                executed_by: executed_by.to_string(),
                executed_at: now,
            },
        };
        match self.db.apply_transition(transition).await {
            Ok(updated) => {
                debug!("🔄️ Order {order_id} is now {}. Balance effect: {effect}", updated.status);
                let operations = self.db.fetch_operations(order_id).await?;
                let result = StatusUpdateResult {
                    order: updated.with_operations(operations),
                    operation_id: operation_id.to_string(),
                    replayed: false,
                };
                Ok((result, from))
            },
            // Someone applied the same operation between our journal check and our write.
            Err(PaymentOrderDbError::DuplicateOperation { .. }) => {
                let record = self
                    .db
                    .fetch_operation(order_id, operation_id)
                    .await?
                    .ok_or_else(|| OrderFlowError::LockContention(order_id.clone()))?;
                self.replay(order_id, record).await
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn replay(
        &self,
        order_id: &OrderId,
        record: OperationRecord,
    ) -> Result<(StatusUpdateResult, OrderStatusType), OrderFlowError> {
        debug!(
            "🔄️ Operation {} was already applied to {order_id} ({} -> {}) by {}. Nothing to do.",
            record.operation_id, record.from_status, record.to_status, record.executed_by
        );
        let order = self
            .db
            .fetch_order_with_operations(order_id)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        let result = StatusUpdateResult { order, operation_id: record.operation_id, replayed: true };
        Ok((result, record.from_status))
    }

    /// Applies each update in turn. Every item gets its own result, in input order, and a failure does not stop the
    /// items after it.
    pub async fn batch_update_status(&self, updates: Vec<StatusUpdateRequest>) -> Vec<BatchUpdateResult> {
        let mut results = Vec::with_capacity(updates.len());
        for update in updates {
            let order_id = update.order_id.clone();
            let result = self.update_status(update).await;
            if let Err(e) = &result {
                debug!("🔄️ Batch item for {order_id} failed. {e}");
            }
            results.push(BatchUpdateResult { order_id, result });
        }
        let ok = results.iter().filter(|r| r.is_success()).count();
        debug!("🔄️ Batch update complete. {ok} of {} succeeded", results.len());
        results
    }

    /// The current status and journal of an order. Takes no lease and changes nothing.
    pub async fn status_history(&self, order_id: &OrderId) -> Result<StatusHistory, OrderFlowError> {
        let order = self
            .db
            .fetch_order_with_operations(order_id)
            .await?
            .ok_or_else(|| OrderFlowError::OrderNotFound(order_id.clone()))?;
        Ok(StatusHistory { order_id: order.order_id, current_status: order.status, operations: order.operations })
    }

    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Option<Order>, OrderFlowError> {
        let order = self.db.fetch_order_with_operations(order_id).await?;
        Ok(order)
    }

    /// Moves `PENDING` orders created more than `pending_timeout` ago to `EXPIRED`, and `PROCESSING` orders that
    /// started processing more than `processing_timeout` ago to `TIMEOUT`.
    ///
    /// Each move goes through [`Self::update_status`] with a fixed operation id per order, so running the sweep twice
    /// cannot move an order twice. Orders that cannot be moved this time (e.g. because they are locked) are reported in
    /// [`ExpiryResult::failed`] and picked up again by the next sweep.
    pub async fn expire_stale_orders(
        &self,
        pending_timeout: Duration,
        processing_timeout: Duration,
    ) -> Result<ExpiryResult, OrderFlowError> {
        let now = Utc::now();
        let mut result = ExpiryResult::default();

        let query = OrderQueryFilter::default().with_status(OrderStatusType::Pending).created_before(now - pending_timeout);
        let stale_pending = self.db.search_orders(query).await?;
        trace!("🕰️ {} pending orders have expired", stale_pending.len());
        for order in stale_pending {
            let reason = format!("No progress within {} minutes of creation", pending_timeout.num_minutes());
            match self.sweep_order(order.order_id.clone(), OrderStatusType::Expired, reason).await {
                Ok(order) => result.expired.push(order),
                Err(e) => result.failed.push((order.order_id, e)),
            }
        }

        let query = OrderQueryFilter::default()
            .with_status(OrderStatusType::Processing)
            .processing_started_before(now - processing_timeout);
        let stale_processing = self.db.search_orders(query).await?;
        trace!("🕰️ {} processing orders have timed out", stale_processing.len());
        for order in stale_processing {
            let reason = format!("Provider did not report within {} minutes", processing_timeout.num_minutes());
            match self.sweep_order(order.order_id.clone(), OrderStatusType::Timeout, reason).await {
                Ok(order) => result.timed_out.push(order),
                Err(e) => result.failed.push((order.order_id, e)),
            }
        }

        if result.total_count() > 0 || result.failed_count() > 0 {
            info!(
                "🕰️ Expiry sweep: {} expired, {} timed out, {} could not be moved",
                result.expired_count(),
                result.timed_out_count(),
                result.failed_count()
            );
        }
        Ok(result)
    }

    async fn sweep_order(&self, order_id: OrderId, to: OrderStatusType, reason: String) -> Result<Order, OrderFlowError> {
        let operation_id = sweep_operation_id(&order_id, to);
        let request = StatusUpdateRequest::new(order_id, to)
            .with_data(TransitionData::default().with_reason(reason))
            .with_operation_id(operation_id)
            .executed_by(EXPIRY_SWEEPER);
        let result = self.update_status(request).await?;
        Ok(result.order)
    }

    /// Removes all expired leases. Returns the number removed.
    pub async fn sweep_expired_locks(&self) -> Result<u64, OrderFlowError> {
        let count = self.locks.sweep_expired().await?;
        Ok(count)
    }

    /// Closes the backend. The state machine must not be used afterwards.
    pub async fn shutdown(&mut self) -> Result<(), OrderFlowError> {
        self.db.close().await?;
        info!("🔄️ Order state machine has shut down");
        Ok(())
    }
}
