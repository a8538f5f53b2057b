//! Self-trade prevention.
//!
//! Grounded on the teacher's `orderbook::stp` module: the same four-mode
//! enum and the same "scan this price level first, decide the disposition
//! before matching any quantity" strategy, adapted to the spec's flat
//! `Order`/`u64` `UserId` (no generic extra fields, no hashed user key).

use crate::types::{OrderId, StpPolicy, UserId};

/// Disposition once a resting order owned by the taker's own user is found
/// at the price level currently being matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StpAction {
    /// No conflicting resting order at this level; match normally.
    NoConflict,
    /// Cancel the taker's remaining quantity; the maker(s) stay resting.
    CancelTaker,
    /// Cancel the named resting maker order(s); the taker keeps matching.
    CancelMaker { maker_order_ids: Vec<OrderId> },
    /// Cancel both the taker remainder and the named maker order.
    CancelBoth { maker_order_id: OrderId },
}

/// Scans `resident_orders` (in arrival order) for any order owned by
/// `taker_user_id` and decides the disposition per `policy`. Stops scanning
/// at the first conflicting price level, mirroring the teacher's
/// `check_stp_at_level`: STP is a pre-match gate per level, not a global scan.
pub fn check_stp_at_level(
    policy: StpPolicy,
    taker_user_id: UserId,
    resident_orders: &[(OrderId, UserId)],
) -> StpAction {
    if matches!(policy, StpPolicy::Allow) {
        return StpAction::NoConflict;
    }

    let conflicts: Vec<OrderId> = resident_orders
        .iter()
        .filter(|(_, maker_user)| *maker_user == taker_user_id)
        .map(|(id, _)| *id)
        .collect();

    if conflicts.is_empty() {
        return StpAction::NoConflict;
    }

    match policy {
        StpPolicy::Allow => StpAction::NoConflict,
        StpPolicy::CancelTaker => StpAction::CancelTaker,
        StpPolicy::CancelMaker => StpAction::CancelMaker {
            maker_order_ids: conflicts,
        },
        StpPolicy::CancelBoth => StpAction::CancelBoth {
            maker_order_id: conflicts[0],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_never_conflicts() {
        let action = check_stp_at_level(StpPolicy::Allow, 1, &[(10, 1)]);
        assert_eq!(action, StpAction::NoConflict);
    }

    #[test]
    fn no_conflict_when_different_user() {
        let action = check_stp_at_level(StpPolicy::CancelBoth, 1, &[(10, 2)]);
        assert_eq!(action, StpAction::NoConflict);
    }

    #[test]
    fn cancel_maker_collects_all_conflicting_ids() {
        let action = check_stp_at_level(StpPolicy::CancelMaker, 1, &[(10, 1), (11, 2), (12, 1)]);
        assert_eq!(
            action,
            StpAction::CancelMaker {
                maker_order_ids: vec![10, 12]
            }
        );
    }
}
