//! FIFO order storage at a single price level.
//!
//! Grounded on `pricelevel::order_queue::OrderQueue`: a `DashMap` gives O(1)
//! lookup/removal by order id, while insertion order is tracked separately
//! for price-time-priority iteration. The teacher's `OrderQueue` uses a
//! `SegQueue<OrderId>` alongside its map and skips stale ids on pop; this
//! adapts the same two-structure idea to the spec's residency-handle
//! contract, where `remove` must be O(1) given the handle rather than a scan.

use crate::types::{OrderId, Price, Quantity, UserId};
use dashmap::DashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

struct Resident {
    user_id: UserId,
    remaining: Quantity,
}

/// All resting orders at one price, in arrival order.
pub struct PriceLevel {
    pub price: Price,
    orders: DashMap<OrderId, Resident>,
    /// Arrival order of order ids. Lazily compacted: a cancelled id is left
    /// in place and skipped during iteration rather than removed eagerly,
    /// keeping `remove` O(1) given the id is already known to the caller.
    fifo: Mutex<VecDeque<OrderId>>,
    total_quantity: AtomicI64,
}

impl PriceLevel {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            orders: DashMap::new(),
            fifo: Mutex::new(VecDeque::new()),
            total_quantity: AtomicI64::new(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity.load(Ordering::Relaxed)
    }

    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Adds a resting order with `remaining` quantity at this level.
    pub fn insert(&self, order_id: OrderId, user_id: UserId, remaining: Quantity) {
        self.orders.insert(order_id, Resident { user_id, remaining });
        self.fifo.lock().expect("price level fifo poisoned").push_back(order_id);
        self.total_quantity.fetch_add(remaining, Ordering::Relaxed);
    }

    /// Removes an order entirely. Returns its last known remaining quantity.
    pub fn remove(&self, order_id: OrderId) -> Option<Quantity> {
        let (_, resident) = self.orders.remove(&order_id)?;
        self.total_quantity.fetch_sub(resident.remaining, Ordering::Relaxed);
        Some(resident.remaining)
    }

    /// Reduces an order's remaining quantity after a partial fill. Panics if
    /// `order_id` is not resident — callers must check first.
    pub fn reduce(&self, order_id: OrderId, filled: Quantity) {
        if let Some(mut entry) = self.orders.get_mut(&order_id) {
            entry.remaining -= filled;
            self.total_quantity.fetch_sub(filled, Ordering::Relaxed);
        }
    }

    pub fn remaining_of(&self, order_id: OrderId) -> Option<Quantity> {
        self.orders.get(&order_id).map(|r| r.remaining)
    }

    pub fn user_of(&self, order_id: OrderId) -> Option<UserId> {
        self.orders.get(&order_id).map(|r| r.user_id)
    }

    /// Resident `(order_id, user_id)` pairs in arrival order, for self-trade
    /// prevention scans.
    pub fn fifo_with_users(&self) -> Vec<(OrderId, UserId)> {
        self.iter_fifo()
            .into_iter()
            .filter_map(|id| self.orders.get(&id).map(|r| (id, r.user_id)))
            .collect()
    }

    /// Iterates resident order ids in arrival order, skipping ids that have
    /// since been fully removed. Compacts the backing deque as it goes.
    pub fn iter_fifo(&self) -> Vec<OrderId> {
        let mut fifo = self.fifo.lock().expect("price level fifo poisoned");
        fifo.retain(|id| self.orders.contains_key(id));
        fifo.iter().copied().collect()
    }
}
