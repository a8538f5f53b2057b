//! The ordered price index and single-instrument order book.
//!
//! Grounded on the teacher's `OrderBook`: a `crossbeam_skiplist::SkipMap`
//! keyed by price per side, plus an `AtomicCell`-backed best-price cache so
//! the common "what's the best bid/ask" query avoids a skiplist traversal.

use crate::price_level::PriceLevel;
use crate::types::{InstrumentId, Price, Side};
use crossbeam::atomic::AtomicCell;
use crossbeam_skiplist::SkipMap;
use std::sync::Arc;

/// One side (bid or ask) of the book: a price-ordered map of price levels.
///
/// Bids are keyed by negated price so that `SkipMap`'s ascending iteration
/// yields highest-price-first, matching asks' natural ascending order —
/// both sides iterate best-first with a single `.iter()` call.
pub struct OrderBookSide {
    side: Side,
    levels: SkipMap<Price, Arc<PriceLevel>>,
    best: AtomicCell<Option<Price>>,
}

impl OrderBookSide {
    fn new(side: Side) -> Self {
        Self {
            side,
            levels: SkipMap::new(),
            best: AtomicCell::new(None),
        }
    }

    fn sort_key(&self, price: Price) -> Price {
        match self.side {
            Side::Buy => -price,
            Side::Sell => price,
        }
    }

    pub fn get_or_create(&self, price: Price) -> Arc<PriceLevel> {
        let key = self.sort_key(price);
        let entry = self
            .levels
            .get_or_insert_with(key, || Arc::new(PriceLevel::new(price)));
        self.refresh_best();
        entry.value().clone()
    }

    pub fn get(&self, price: Price) -> Option<Arc<PriceLevel>> {
        self.levels.get(&self.sort_key(price)).map(|e| e.value().clone())
    }

    pub fn remove_if_empty(&self, price: Price) {
        let key = self.sort_key(price);
        if let Some(entry) = self.levels.get(&key) {
            if entry.value().is_empty() {
                entry.remove();
            }
        }
        self.refresh_best();
    }

    /// Best (highest bid / lowest ask) resting price, or `None` if the side is empty.
    pub fn best_price(&self) -> Option<Price> {
        self.best.load()
    }

    fn refresh_best(&self) {
        let best = self.levels.front().map(|e| e.value().price);
        self.best.store(best);
    }

    /// Iterates price levels in best-first order.
    pub fn iter_levels(&self) -> impl Iterator<Item = Arc<PriceLevel>> + '_ {
        self.levels.iter().map(|e| e.value().clone())
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

/// A single instrument's order book: bid side, ask side, and identity.
pub struct OrderBook {
    pub instrument_id: InstrumentId,
    pub bids: OrderBookSide,
    pub asks: OrderBookSide,
}

impl OrderBook {
    pub fn new(instrument_id: InstrumentId) -> Self {
        Self {
            instrument_id,
            bids: OrderBookSide::new(Side::Buy),
            asks: OrderBookSide::new(Side::Sell),
        }
    }

    pub fn side(&self, side: Side) -> &OrderBookSide {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    pub fn opposite_side(&self, side: Side) -> &OrderBookSide {
        self.side(side.opposite())
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// A point-in-time depth snapshot: up to `levels` price levels per side,
    /// best first, as `(price, total_quantity)` pairs.
    pub fn snapshot_depth(&self, levels: usize) -> (Vec<(Price, i64)>, Vec<(Price, i64)>) {
        let bids = self
            .bids
            .iter_levels()
            .take(levels)
            .map(|l| (l.price, l.total_quantity()))
            .collect();
        let asks = self
            .asks
            .iter_levels()
            .take(levels)
            .map(|l| (l.price, l.total_quantity()))
            .collect();
        (bids, asks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bid_side_best_is_highest_price() {
        let side = OrderBookSide::new(Side::Buy);
        side.get_or_create(100);
        side.get_or_create(105);
        side.get_or_create(95);
        assert_eq!(side.best_price(), Some(105));
    }

    #[test]
    fn ask_side_best_is_lowest_price() {
        let side = OrderBookSide::new(Side::Sell);
        side.get_or_create(100);
        side.get_or_create(95);
        side.get_or_create(105);
        assert_eq!(side.best_price(), Some(95));
    }

    #[test]
    fn removing_last_order_clears_best() {
        let side = OrderBookSide::new(Side::Buy);
        let level = side.get_or_create(100);
        level.insert(1, 99, 10);
        level.remove(1);
        side.remove_if_empty(100);
        assert_eq!(side.best_price(), None);
    }
}
