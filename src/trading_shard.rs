//! Trading shard hooks: the narrow seam through which account/margin
//! bookkeeping (explicitly out of scope for this crate) is consulted.
//!
//! Grounded on
//! `original_source/versions/production_safe_optimized/include/core/trading_shard.h`:
//! `pre_check`/`post_trade` as the only two entry points into user-owned
//! state, plus a per-user `user_orders` index for an out-of-band "list a
//! user's live orders" query that the original keeps alongside (not part
//! of) margin bookkeeping.

use crate::order::{Order, Trade};
use crate::types::{OrderId, UserId};
use dashmap::DashMap;

/// A trading shard owns one partition of per-user state (by `user_id`) and
/// is consulted by the engine before an order is accepted and after a
/// trade executes. Implementations may reserve balance, enforce position
/// limits, or be a complete no-op, as benchmark configurations are.
pub trait TradingShard: Send + Sync {
    /// Called before an order is handed to the matching kernel. Returning
    /// `false` rejects the order with no book or WAL mutation.
    fn pre_check(&self, order: &Order) -> bool;

    /// Called after an order has been matched, with every trade it produced.
    fn post_trade(&self, order: &Order, trades: &[Trade]);
}

/// A `TradingShard` that accepts everything and performs no bookkeeping,
/// aside from the in-scope `user_orders` convenience index. Suitable for
/// benchmark configurations and as the default when no account/margin
/// system is wired in.
#[derive(Default)]
pub struct NoopTradingShard {
    user_orders: DashMap<UserId, Vec<OrderId>>,
}

impl NoopTradingShard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live order ids previously accepted for `user_id`, most-recent last.
    /// Read-only convenience; not margin or position bookkeeping.
    pub fn user_orders(&self, user_id: UserId) -> Vec<OrderId> {
        self.user_orders.get(&user_id).map(|v| v.clone()).unwrap_or_default()
    }

    fn record(&self, order_id: OrderId, user_id: UserId) {
        self.user_orders.entry(user_id).or_default().push(order_id);
    }

    fn forget(&self, order_id: OrderId, user_id: UserId) {
        if let Some(mut ids) = self.user_orders.get_mut(&user_id) {
            ids.retain(|&id| id != order_id);
        }
    }
}

impl TradingShard for NoopTradingShard {
    fn pre_check(&self, order: &Order) -> bool {
        self.record(order.id, order.user_id);
        true
    }

    fn post_trade(&self, order: &Order, trades: &[Trade]) {
        if order.is_done() {
            self.forget(order.id, order.user_id);
        }
        let _ = trades;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderStatus, OrderType, Side};

    #[test]
    fn tracks_and_forgets_user_orders() {
        let shard = NoopTradingShard::new();
        let mut order = Order::new(1, 42, 1, Side::Buy, OrderType::Limit, 100, 10, 0, 0);
        assert!(shard.pre_check(&order));
        assert_eq!(shard.user_orders(42), vec![1]);
        order.status = OrderStatus::Filled;
        shard.post_trade(&order, &[]);
        assert!(shard.user_orders(42).is_empty());
    }
}
