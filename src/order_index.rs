//! Order-id index mapping a live order id to its resting location.
//!
//! Grounded on the teacher's `OrderBook::order_locations: DashMap<Id,
//! (u128, Side)>` — O(1) cancel-by-id without scanning the price index.

use crate::types::{OrderId, Price, Side};
use dashmap::DashMap;

#[derive(Debug, Clone, Copy)]
pub struct OrderLocation {
    pub price: Price,
    pub side: Side,
}

#[derive(Default)]
pub struct OrderIndex {
    locations: DashMap<OrderId, OrderLocation>,
}

impl OrderIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, order_id: OrderId, price: Price, side: Side) {
        self.locations.insert(order_id, OrderLocation { price, side });
    }

    pub fn get(&self, order_id: OrderId) -> Option<OrderLocation> {
        self.locations.get(&order_id).map(|e| *e)
    }

    pub fn remove(&self, order_id: OrderId) -> Option<OrderLocation> {
        self.locations.remove(&order_id).map(|(_, loc)| loc)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.locations.contains_key(&order_id)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}
