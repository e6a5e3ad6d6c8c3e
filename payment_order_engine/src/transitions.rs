//! The order lifecycle graph.
//!
//! [`allowed_transitions`] is the single source of truth for which moves are legal. [`validate_transition`] adds the
//! guards that depend on the order itself, and [`transitioned_order`] computes what the order looks like after a move.
use chrono::{DateTime, Utc};
use log::trace;

use crate::{
    db_types::{Dispute, Order, OrderStatusType, Refund, RiskInfo},
    ledger::{self, balance_effect, BALANCE_TERMINAL_STATES},
    order_objects::{StateMachineInfo, StateTransitions, TransitionData},
};

pub const INITIAL_STATE: OrderStatusType = OrderStatusType::Pending;

/// The states reachable from `from` in one step.
pub fn allowed_transitions(from: OrderStatusType) -> &'static [OrderStatusType] {
    use OrderStatusType::*;
    match from {
        Pending => &[Processing, Success, Failed, Cancelled, Timeout, Expired, RiskBlocked],
        Processing => &[Success, Failed, PartialSuccess, Disputed, ManualReview, Timeout],
        Success => &[Refunded, PartialRefunded, Disputed, Reversed],
        Failed => &[Cancelled, Disputed, ManualReview],
        Cancelled => &[Disputed],
        Timeout => &[Cancelled, Disputed, ManualReview],
        Expired => &[Cancelled, Disputed],
        PartialSuccess => &[Refunded, PartialRefunded, Disputed],
        Refunded => &[Disputed],
        PartialRefunded => &[Disputed],
        Disputed => &[DisputeResolved, Refunded, PartialRefunded],
        DisputeResolved => &[Refunded, PartialRefunded],
        RiskBlocked => &[ManualReview, Cancelled, Disputed],
        ManualReview => &[Success, Failed, Cancelled, Disputed],
        Reversed => &[Disputed],
    }
}

pub fn can_transition(from: OrderStatusType, to: OrderStatusType) -> bool {
    allowed_transitions(from).contains(&to)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionValidation {
    pub valid: bool,
    pub reason: Option<String>,
}

impl TransitionValidation {
    pub fn ok() -> Self {
        Self { valid: true, reason: None }
    }

    pub fn invalid<S: Into<String>>(reason: S) -> Self {
        Self { valid: false, reason: Some(reason.into()) }
    }
}

/// Checks whether `order`, currently in `from`, may move to `to` with the given payload.
pub fn validate_transition(
    from: OrderStatusType,
    to: OrderStatusType,
    order: &Order,
    data: &TransitionData,
) -> TransitionValidation {
    if from == to {
        return TransitionValidation::invalid(format!("Order is already {to}"));
    }
    if !can_transition(from, to) {
        return TransitionValidation::invalid(format!("Transition from {from} to {to} is not allowed"));
    }
    match to {
        OrderStatusType::Success if !order.funds_frozen => TransitionValidation::invalid(
            "SUCCESS needs the order's funds to still be frozen, but they have already been released",
        ),
        OrderStatusType::Refunded => validate_refund(order, ledger::refund_amount(order, data)),
        OrderStatusType::PartialRefunded => match data.refund_amount() {
            None => TransitionValidation::invalid("PARTIAL_REFUNDED needs an explicit refund amount"),
            Some(amount) if amount >= order.refundable_amount() => TransitionValidation::invalid(format!(
                "A partial refund of {amount} must be less than the refundable remainder of {}. Use REFUNDED instead.",
                order.refundable_amount()
            )),
            Some(amount) => validate_refund(order, amount),
        },
        _ => TransitionValidation::ok(),
    }
}

fn validate_refund(order: &Order, amount: poe_common::Amount) -> TransitionValidation {
    if !amount.is_positive() {
        return TransitionValidation::invalid(format!("Refund amount must be positive, not {amount}"));
    }
    let remainder = order.refundable_amount();
    if amount > remainder {
        return TransitionValidation::invalid(format!(
            "Refund of {amount} exceeds the refundable remainder of {remainder}"
        ));
    }
    TransitionValidation::ok()
}

/// The order as it should look after moving to `to` at time `now`.
///
/// Stamps the lifecycle timestamp, clears the frozen flag if the move releases the hold, fills the sub-record the
/// target state carries, and keeps the payload as the order's additional data. Assumes the move has been validated.
pub fn transitioned_order(order: &Order, to: OrderStatusType, data: &TransitionData, now: DateTime<Utc>) -> Order {
    let mut next = order.clone();
    next.status = to;
    next.timestamps.stamp(to, now);
    next.updated_at = now;
    if balance_effect(order, to, data).releases_hold {
        next.funds_frozen = false;
    }
    match to {
        OrderStatusType::Refunded | OrderStatusType::PartialRefunded => {
            let amount = ledger::refund_amount(order, data);
            let reason = data.refund.as_ref().and_then(|r| r.reason.clone()).or_else(|| data.reason.clone());
            next.refund = Some(Refund {
                total_refunded: order.total_refunded() + amount,
                last_amount: amount,
                reason,
                refunded_at: now,
            });
        },
        OrderStatusType::Disputed => {
            let request = data.dispute.clone().unwrap_or_default();
            next.dispute = Some(Dispute {
                reason: request.reason.or_else(|| data.reason.clone()),
                reference: request.reference,
                opened_at: now,
                resolution: None,
                resolved_at: None,
            });
        },
        OrderStatusType::DisputeResolved => {
            let resolution =
                data.dispute.as_ref().and_then(|d| d.resolution.clone()).or_else(|| data.reason.clone());
            let dispute = next.dispute.get_or_insert_with(|| Dispute {
                reason: None,
                reference: None,
                opened_at: now,
                resolution: None,
                resolved_at: None,
            });
            dispute.resolution = resolution;
            dispute.resolved_at = Some(now);
        },
        OrderStatusType::RiskBlocked => {
            let request = data.risk_info.clone().unwrap_or_default();
            next.risk_info = Some(RiskInfo {
                reason: request.reason.or_else(|| data.reason.clone()),
                score: request.score,
                flagged_at: now,
            });
        },
        _ => {},
    }
    if let Some(reference) = &data.provider_reference {
        next.provider.reference = Some(reference.clone());
    }
    next.additional_data = if data.is_empty() { None } else { serde_json::to_value(data).ok() };
    trace!("🔄️ Order [{}] prepared for {} -> {to}", order.order_id, order.status);
    next
}

/// A read-only description of the lifecycle graph.
pub fn state_machine_info() -> StateMachineInfo {
    let transitions = OrderStatusType::ALL
        .iter()
        .map(|&from| StateTransitions { from, to: allowed_transitions(from).to_vec() })
        .collect();
    StateMachineInfo {
        states: OrderStatusType::ALL.to_vec(),
        initial_state: INITIAL_STATE,
        balance_terminal_states: BALANCE_TERMINAL_STATES.to_vec(),
        transitions,
    }
}

#[cfg(test)]
mod test {
    use poe_common::Amount;

    use super::*;
    use crate::{order_objects::DisputeRequest, test_utils::fixtures::sample_order};

    #[test]
    fn no_self_loops() {
        for status in OrderStatusType::ALL {
            assert!(!can_transition(status, status), "{status} may not loop");
        }
    }

    #[test]
    fn every_state_is_reachable_from_pending() {
        let mut seen = vec![INITIAL_STATE];
        let mut frontier = vec![INITIAL_STATE];
        while let Some(state) = frontier.pop() {
            for &next in allowed_transitions(state) {
                if !seen.contains(&next) {
                    seen.push(next);
                    frontier.push(next);
                }
            }
        }
        assert_eq!(seen.len(), OrderStatusType::ALL.len());
    }

    #[test]
    fn illegal_moves_are_rejected() {
        let order = sample_order(OrderStatusType::Processing, 1000);
        let v = validate_transition(OrderStatusType::Processing, OrderStatusType::Pending, &order, &TransitionData::default());
        assert!(!v.valid);
        assert_eq!(v.reason.unwrap(), "Transition from PROCESSING to PENDING is not allowed");

        let order = sample_order(OrderStatusType::Refunded, 1000);
        let v = validate_transition(OrderStatusType::Refunded, OrderStatusType::Success, &order, &TransitionData::default());
        assert!(!v.valid);
    }

    #[test]
    fn success_needs_frozen_funds() {
        let mut order = sample_order(OrderStatusType::ManualReview, 1000);
        let data = TransitionData::default();
        assert!(validate_transition(OrderStatusType::ManualReview, OrderStatusType::Success, &order, &data).valid);
        order.funds_frozen = false;
        let v = validate_transition(OrderStatusType::ManualReview, OrderStatusType::Success, &order, &data);
        assert!(!v.valid);
    }

    #[test]
    fn refund_guards() {
        let mut order = sample_order(OrderStatusType::Success, 5000);
        order.funds_frozen = false;
        let full = TransitionData::default();
        assert!(validate_transition(OrderStatusType::Success, OrderStatusType::Refunded, &order, &full).valid);

        let too_much = TransitionData::default().with_refund(Some(Amount::from(5001)), None);
        assert!(!validate_transition(OrderStatusType::Success, OrderStatusType::Refunded, &order, &too_much).valid);

        let negative = TransitionData::default().with_refund(Some(Amount::from(-1)), None);
        assert!(!validate_transition(OrderStatusType::Success, OrderStatusType::PartialRefunded, &order, &negative).valid);

        // A partial refund has to say how much, and has to leave something behind
        assert!(!validate_transition(OrderStatusType::Success, OrderStatusType::PartialRefunded, &order, &full).valid);
        let everything = TransitionData::default().with_refund(Some(Amount::from(5000)), None);
        assert!(
            !validate_transition(OrderStatusType::Success, OrderStatusType::PartialRefunded, &order, &everything).valid
        );
        let some = TransitionData::default().with_refund(Some(Amount::from(1200)), None);
        assert!(validate_transition(OrderStatusType::Success, OrderStatusType::PartialRefunded, &order, &some).valid);
    }

    #[test]
    fn transitioned_order_fills_sub_records() {
        let order = sample_order(OrderStatusType::Processing, 5000);
        let now = Utc::now();
        let data = TransitionData::default().with_provider_reference("prov-123");
        let paid = transitioned_order(&order, OrderStatusType::Success, &data, now);
        assert_eq!(paid.status, OrderStatusType::Success);
        assert_eq!(paid.timestamps.paid_at, Some(now));
        assert!(!paid.funds_frozen);
        assert_eq!(paid.provider.reference.as_deref(), Some("prov-123"));
        assert!(paid.additional_data.is_some());

        let data = TransitionData::default().with_refund(Some(Amount::from(2000)), Some("damaged".into()));
        let refunded = transitioned_order(&paid, OrderStatusType::PartialRefunded, &data, now);
        let refund = refunded.refund.as_ref().unwrap();
        assert_eq!(refund.total_refunded, Amount::from(2000));
        assert_eq!(refund.reason.as_deref(), Some("damaged"));
        assert_eq!(refunded.refundable_amount(), Amount::from(3000));

        let rest = transitioned_order(&refunded, OrderStatusType::Refunded, &TransitionData::default(), now);
        assert_eq!(rest.total_refunded(), Amount::from(5000));
        assert_eq!(rest.refund.unwrap().last_amount, Amount::from(3000));
        assert!(rest.additional_data.is_none());

        let data = TransitionData::default().with_dispute(DisputeRequest {
            reason: Some("chargeback".into()),
            reference: Some("cb-9".into()),
            resolution: None,
        });
        let disputed = transitioned_order(&paid, OrderStatusType::Disputed, &data, now);
        let data = TransitionData::default().with_dispute(DisputeRequest {
            resolution: Some("merchant won".into()),
            ..Default::default()
        });
        let resolved = transitioned_order(&disputed, OrderStatusType::DisputeResolved, &data, now);
        let dispute = resolved.dispute.unwrap();
        assert_eq!(dispute.reason.as_deref(), Some("chargeback"));
        assert_eq!(dispute.resolution.as_deref(), Some("merchant won"));
        assert_eq!(dispute.resolved_at, Some(now));
    }

    #[test]
    fn info_lists_the_whole_graph() {
        let info = state_machine_info();
        assert_eq!(info.states.len(), 15);
        assert_eq!(info.initial_state, OrderStatusType::Pending);
        assert_eq!(info.balance_terminal_states.len(), 5);
        let pending = info.transitions.iter().find(|t| t.from == OrderStatusType::Pending).unwrap();
        assert_eq!(pending.to.len(), 7);
    }
}
