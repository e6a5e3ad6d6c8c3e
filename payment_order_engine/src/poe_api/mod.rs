//! # Payment order engine public API
//!
//! The `poe_api` module exposes the programmatic API for the payment order engine. The API is modular, so that clients
//! can pick the functionality they need.
//!
//! * [`order_creation_api`] opens new orders, freezing the order amount on the merchant's account and enforcing the
//!   merchant's limits.
//! * [`state_machine_api`] is the only way to move an existing order through its lifecycle. It serialises concurrent
//!   updates with per-order leases and makes retries idempotent.
//! * [`merchant_api`] manages merchant accounts and gives read access to their orders.
//! * [`lock_api`] wraps the lease store used by the state machine.
//!
//! # API usage
//!
//! Every API is created by supplying a database backend that implements the backend traits it needs:
//!
//! ```rust,ignore
//! use payment_order_engine::{events::EventProducers, LockConfig, OrderStateMachine, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let machine = OrderStateMachine::new(db, LockConfig::default(), EventProducers::default());
//! let result = machine.update_status(StatusUpdateRequest::new("ORD123", OrderStatusType::Processing)).await?;
//! ```

pub mod errors;
pub mod lock_api;
pub mod merchant_api;
pub mod order_creation_api;
pub mod order_objects;
pub mod state_machine_api;
