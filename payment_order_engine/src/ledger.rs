//! Balance ledger effects.
//!
//! Pure functions that map a proposed status transition onto the deltas it causes on the merchant's balance account.
//! Nothing here touches the database: the state machine computes the effect first, and the backend applies it as a
//! single atomic increment.
//!
//! | Entering                                  | available        | frozen      |
//! |-------------------------------------------|------------------|-------------|
//! | `SUCCESS`                                 | `+ amount`       | `- amount`  |
//! | `FAILED`, `CANCELLED`, `TIMEOUT`, `EXPIRED` | unchanged      | `- amount` (only while the hold is in place) |
//! | `REFUNDED`                                | `- refund`       | unchanged   |
//! | `PARTIAL_REFUNDED`                        | `- refund`       | unchanged   |
//! | anything else                             | unchanged        | unchanged   |
use std::fmt::Display;

use poe_common::Amount;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{MerchantBalance, Order, OrderStatusType},
    order_objects::TransitionData,
};

/// States whose entry releases the order's frozen funds.
pub const BALANCE_TERMINAL_STATES: [OrderStatusType; 5] = [
    OrderStatusType::Success,
    OrderStatusType::Failed,
    OrderStatusType::Cancelled,
    OrderStatusType::Timeout,
    OrderStatusType::Expired,
];

pub fn is_balance_terminal(status: OrderStatusType) -> bool {
    BALANCE_TERMINAL_STATES.contains(&status)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceEffect {
    pub available_delta: Amount,
    pub frozen_delta: Amount,
    /// The transition gives the order's hold back, so the order no longer has frozen funds.
    pub releases_hold: bool,
}

impl BalanceEffect {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        self.available_delta.is_zero() && self.frozen_delta.is_zero()
    }

    /// The balance that results from applying this effect to `balance`. Used for snapshots; the backend applies the
    /// deltas atomically rather than writing this value back.
    pub fn apply_to(&self, balance: MerchantBalance) -> MerchantBalance {
        MerchantBalance::new(balance.available + self.available_delta, balance.frozen + self.frozen_delta)
    }

    /// The balance before this effect was applied, given the balance after it.
    pub fn revert_from(&self, balance: MerchantBalance) -> MerchantBalance {
        MerchantBalance::new(balance.available - self.available_delta, balance.frozen - self.frozen_delta)
    }
}

impl Display for BalanceEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "available {:+}, frozen {:+}", self.available_delta.value(), self.frozen_delta.value())
    }
}

/// The amount a refund transition moves out of the available balance: the explicitly requested amount, or the
/// refundable remainder of the order when none was given.
pub fn refund_amount(order: &Order, data: &TransitionData) -> Amount {
    data.refund_amount().unwrap_or_else(|| order.refundable_amount())
}

/// The effect of moving `order` into `to`.
///
/// The result assumes the transition has already been validated. In particular it does not check that a refund fits
/// in the available balance; the store rejects any effect that would take a balance below zero.
pub fn balance_effect(order: &Order, to: OrderStatusType, data: &TransitionData) -> BalanceEffect {
    use OrderStatusType::*;
    match to {
        Success => {
            let frozen_delta = if order.funds_frozen { -order.amount } else { Amount::ZERO };
            BalanceEffect { available_delta: order.amount, frozen_delta, releases_hold: order.funds_frozen }
        },
        Failed | Cancelled | Timeout | Expired if order.funds_frozen => {
            BalanceEffect { available_delta: Amount::ZERO, frozen_delta: -order.amount, releases_hold: true }
        },
        Refunded | PartialRefunded => {
            BalanceEffect { available_delta: -refund_amount(order, data), frozen_delta: Amount::ZERO, releases_hold: false }
        },
        _ => BalanceEffect::none(),
    }
}
