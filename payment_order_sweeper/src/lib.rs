//! # Payment order sweeper
//!
//! A small scheduler process that keeps a payment order store tidy. It runs two periodic jobs against the database
//! that the payment order engine uses:
//! * the lock sweep, which deletes order leases whose holder died or hung without releasing them, and
//! * the expiry sweep, which moves stale `PENDING` orders to `EXPIRED` and stuck `PROCESSING` orders to `TIMEOUT`,
//!   releasing the funds they hold.
//!
//! Both jobs go through the engine's public API, so they take the same per-order leases and obey the same lifecycle
//! rules as every other caller.
//!
//! ## Configuration
//! The sweeper is configured via environment variables. See [config](config/index.html) for more information.
pub mod cli;
pub mod config;
pub mod errors;
pub mod sweeper;
pub mod workers;
