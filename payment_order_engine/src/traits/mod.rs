//! # Backend contracts
//!
//! The traits in this module define what a persistence backend must provide to act as the store for the payment order
//! engine. [`crate::SqliteDatabase`] is the bundled implementation.
//!
//! * [`PaymentOrderDatabase`] is the highest level contract: inserting orders and persisting validated transitions.
//! * [`OrderManagement`] provides read access to orders, transactions and operation journals.
//! * [`MerchantManagement`] manages merchant balance accounts with atomic increments.
//! * [`LockManagement`] stores the per-order leases used for mutual exclusion.
mod data_objects;
mod lock_management;
mod merchant_management;
mod order_management;
mod payment_order_database;

pub use data_objects::AppliedTransition;
pub use lock_management::{LockError, LockManagement};
pub use merchant_management::{MerchantError, MerchantManagement};
pub use order_management::{OrderManagement, PaymentOrderDbError};
pub use payment_order_database::PaymentOrderDatabase;
