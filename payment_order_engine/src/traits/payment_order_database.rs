use crate::{
    db_types::{BalanceSnapshot, NewOrder, Order},
    order_objects::CreatedOrder,
    traits::{
        data_objects::AppliedTransition,
        LockManagement,
        MerchantManagement,
        OrderManagement,
        PaymentOrderDbError,
    },
};

/// This trait defines the highest level of behaviour for backends supporting the payment order engine.
///
/// On top of the order, merchant and lock contracts it inherits, a backend must be able to
/// * store a new order together with its ledger transaction, and
/// * persist a validated status transition (journal entry, balance effect, order and transaction updates) as one unit.
#[allow(async_fn_in_trait)]
pub trait PaymentOrderDatabase: Clone + OrderManagement + MerchantManagement + LockManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Inserts a `PENDING` order with its funds marked as frozen, and the mirroring transaction.
    ///
    /// The merchant balance is *not* touched here; the creation flow has already frozen the funds and passes the
    /// balance before and after that freeze as `snapshot`. Fails with [`PaymentOrderDbError::OrderAlreadyExists`] if the
    /// order id is taken.
    async fn insert_order(&self, order: NewOrder, snapshot: BalanceSnapshot) -> Result<CreatedOrder, PaymentOrderDbError>;

    /// Persists a transition atomically:
    /// * appends the journal entry (fails with [`PaymentOrderDbError::DuplicateOperation`] if the operation id is
    ///   already recorded for the order),
    /// * applies the balance effect to the merchant account,
    /// * writes the new order state, provided the order is still in `from_status` (else
    ///   [`PaymentOrderDbError::StaleOrder`]),
    /// * updates the transaction's status, cumulative balance change and snapshot.
    ///
    /// Either everything is written or nothing is.
    async fn apply_transition(&self, transition: AppliedTransition) -> Result<Order, PaymentOrderDbError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentOrderDbError>;
}
