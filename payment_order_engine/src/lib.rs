//! Payment Order Engine
//!
//! The payment order engine tracks deposit and withdrawal orders for merchants of a payment gateway. It owns three
//! things:
//! 1. The order lifecycle ([`transitions`]): which status changes are allowed, and the guards on them.
//! 2. The merchant ledger ([`ledger`]): how each change moves money between a merchant's available and frozen balance.
//!    Opening an order freezes its amount; a terminal outcome releases the hold, and refunds debit the available
//!    balance.
//! 3. Safe concurrent mutation ([`mod@poe_api`]): per-order leases, idempotent operation ids, and atomic persistence of
//!    each transition.
//!
//! Storage is behind the backend traits in [`traits`]. [`SqliteDatabase`] is the bundled implementation.
//!
//! The engine also emits events when orders are created or change status. A simple actor framework ([`events`]) lets
//! you hook into these and run custom actions, such as notifying the merchant's callback URL.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod ledger;
pub mod poe_api;
pub mod traits;
pub mod transitions;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use poe_api::{
    errors::{LimitKind, OrderFlowError},
    lock_api::{LockConfig, LockManager},
    merchant_api::MerchantApi,
    order_creation_api::OrderCreationApi,
    order_objects,
    state_machine_api::OrderStateMachine,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    LockError,
    LockManagement,
    MerchantError,
    MerchantManagement,
    OrderManagement,
    PaymentOrderDatabase,
    PaymentOrderDbError,
};
