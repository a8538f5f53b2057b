//! The integration engine: one `OrderBook`, one order-id index, one WAL,
//! composed behind a single struct configured at construction.
//!
//! Grounded on the teacher's pattern of a single `OrderBook<T>` composed
//! from its pieces rather than the original C++'s `MatchingEngine →
//! MatchingEngineEventSourcing → MatchingEngineOptimizedV3 → …` inheritance
//! chain — durability mode, STP policy, and trading shard are all
//! configuration passed to `MatchingEngine::new`, not distinct subclasses.

use crate::book::OrderBook;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::matching::{match_order, SequenceGenerator};
use crate::metrics::{LatencyHistograms, ShardCounters};
use crate::order::{Event, Order, Trade};
use crate::order_index::OrderIndex;
use crate::trading_shard::TradingShard;
use crate::types::{InstrumentId, OrderId, OrderStatus, OrderType, Price, Quantity, StpPolicy, Timestamp, UserId};
use crate::wal::Wal;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Result of `process_order`: the trades produced and a receipt describing
/// whether the append has been fsynced yet.
#[derive(Debug, Clone, Copy, Default)]
pub struct DurabilityReceipt {
    /// The sequence id of the last event this call appended (the last
    /// trade produced, or the taker order itself if none), assigned by this
    /// engine's `SequenceGenerator` — not the WAL's segment-naming write
    /// counter, which lives in a separate number space.
    pub sequence_id: u64,
    pub durability_confirmed: bool,
}

/// One matching shard: book, order-id index, WAL, and the trading shard it
/// consults before accepting and after trading.
pub struct MatchingEngine {
    instrument_id: InstrumentId,
    book: OrderBook,
    index: OrderIndex,
    wal: Wal,
    sequencer: SequenceGenerator,
    stp_policy: StpPolicy,
    max_match_iterations: usize,
    trading_shard: Arc<dyn TradingShard>,
    clock: Arc<dyn Clock>,
    counters: ShardCounters,
    latencies: LatencyHistograms,
    wait_for_durability: Option<Duration>,
    recovered: std::sync::atomic::AtomicU64,
}

impl MatchingEngine {
    /// `segment_capacity` is an mmap-rotation implementation detail, not
    /// part of the environment config table, so it stays an explicit
    /// parameter rather than an `EngineConfig` field.
    pub fn new(
        instrument_id: InstrumentId,
        segment_capacity: u64,
        config: EngineConfig,
        trading_shard: Arc<dyn TradingShard>,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        Ok(Self {
            instrument_id,
            book: OrderBook::new(instrument_id),
            index: OrderIndex::new(),
            wal: Wal::open(
                &config.wal_dir,
                segment_capacity,
                config.durability_mode(),
                config.wal_queue_capacity as usize,
                config.sync_interval_ms,
                config.sync_batch_size,
            )?,
            sequencer: SequenceGenerator::new(1),
            stp_policy: config.stp_policy,
            max_match_iterations: config.max_match_iterations as usize,
            trading_shard,
            clock: Arc::new(SystemClock),
            counters: ShardCounters::default(),
            latencies: LatencyHistograms::new(),
            wait_for_durability: None,
            recovered: std::sync::atomic::AtomicU64::new(0),
        })
    }

    /// Inserts an already-decided resting order directly into the book,
    /// bypassing matching and the WAL. Used only during [`crate::recovery`].
    pub(crate) fn replay_resting_order(&self, order: Order) {
        self.recovered.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let resting = order.remaining > 0
            && matches!(order.order_type, OrderType::Limit)
            && matches!(order.status, OrderStatus::Pending | OrderStatus::PartialFilled);
        if resting {
            let level = self.book.side(order.side).get_or_create(order.price);
            level.insert(order.id, order.user_id, order.remaining);
            self.index.insert(order.id, order.price, order.side);
        }
    }

    /// Applies a previously-recorded trade's book-side effect during
    /// recovery: the maker's resting quantity (if any survived as a fresh
    /// `Order` record after this trade) is already accounted for by that
    /// record, so this only advances the recovered-sequence counter.
    pub(crate) fn replay_trade(&self, _trade: &Trade) {
        self.recovered.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    }

    /// Removes a previously-recorded cancellation's target from the book,
    /// if it was replayed as resting.
    pub(crate) fn replay_cancel(&self, order_id: OrderId) {
        self.recovered.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        if let Some(location) = self.index.remove(order_id) {
            if let Some(level) = self.book.side(location.side).get(location.price) {
                level.remove(order_id);
                self.book.side(location.side).remove_if_empty(location.price);
            }
        }
    }

    pub(crate) fn recovered_sequence(&self) -> u64 {
        self.recovered.load(std::sync::atomic::Ordering::Relaxed)
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Enables the guaranteed-persistence async mode: after queuing the
    /// append, block up to `timeout` for `last_written_seq >= seq` before
    /// acknowledging.
    pub fn wait_for_durability(mut self, timeout: Duration) -> Self {
        self.wait_for_durability = Some(timeout);
        self
    }

    pub fn counters(&self) -> &ShardCounters {
        &self.counters
    }

    pub fn latencies(&self) -> &LatencyHistograms {
        &self.latencies
    }

    /// Submits a new order, consulting this engine's own bound trading
    /// shard. Single-threaded caller contract: the engine assumes it is the
    /// only writer to its book, index, and WAL.
    pub fn process_order(
        &self,
        order_id: OrderId,
        user_id: UserId,
        side: crate::types::Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
    ) -> Result<(Vec<Trade>, DurabilityReceipt), EngineError> {
        self.process_order_routed(
            order_id,
            user_id,
            side,
            order_type,
            price,
            quantity,
            self.trading_shard.as_ref(),
        )
    }

    /// Submits a new order, consulting `trading_shard` instead of this
    /// engine's own bound shard. Lets a front end route the user-owned
    /// trading-shard dimension independently of the per-instrument matching
    /// shard this `MatchingEngine` represents.
    #[allow(clippy::too_many_arguments)]
    pub fn process_order_routed(
        &self,
        order_id: OrderId,
        user_id: UserId,
        side: crate::types::Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
        trading_shard: &dyn TradingShard,
    ) -> Result<(Vec<Trade>, DurabilityReceipt), EngineError> {
        let start = Instant::now();
        let result =
            self.process_order_inner(order_id, user_id, side, order_type, price, quantity, trading_shard);
        self.latencies.record(start.elapsed().as_nanos() as u64);
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn process_order_inner(
        &self,
        order_id: OrderId,
        user_id: UserId,
        side: crate::types::Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
        trading_shard: &dyn TradingShard,
    ) -> Result<(Vec<Trade>, DurabilityReceipt), EngineError> {
        if quantity <= 0 {
            return Err(EngineError::InvalidOrder("quantity must be positive"));
        }
        if matches!(order_type, OrderType::Limit) && price <= 0 {
            return Err(EngineError::InvalidOrder("limit price must be positive"));
        }
        if self.index.contains(order_id) {
            return Err(EngineError::DuplicateOrder(order_id));
        }

        // The taker's own sequence id is assigned here, strictly before
        // matching, so it is ordered ahead of every trade it produces.
        let taker_seq = self.sequencer.next();
        let mut order = Order::new(
            order_id,
            user_id,
            self.instrument_id,
            side,
            order_type,
            price,
            quantity,
            taker_seq,
            self.clock.now_ns(),
        );

        if !trading_shard.pre_check(&order) {
            order.status = OrderStatus::Rejected;
            warn!(order_id, user_id, "trading shard rejected order");
            return Err(EngineError::ShardRejected(order_id, "pre_check failed".into()));
        }

        let outcome = match_order(
            &mut order,
            &self.book,
            self.stp_policy,
            self.clock.as_ref(),
            &self.sequencer,
            self.max_match_iterations,
        )?;

        for &id in &outcome.filled_makers {
            self.index.remove(id);
        }
        for &id in &outcome.cancelled_makers {
            self.index.remove(id);
        }

        if matches!(order.order_type, OrderType::Limit) && order.remaining > 0 && !order.is_done() {
            let level = self.book.side(order.side).get_or_create(order.price);
            level.insert(order.id, order.user_id, order.remaining);
            self.index.insert(order.id, order.price, order.side);
        }

        self.counters.record_order();
        self.counters.record_trades(outcome.trades.len() as u64);

        let mut events = Vec::with_capacity(1 + outcome.trades.len());
        events.push(Event::Accepted {
            sequence: order.sequence_id,
            order: order.clone(),
        });
        for trade in &outcome.trades {
            events.push(Event::Traded {
                sequence: trade.trade_id,
                trade: trade.clone(),
            });
        }
        let (last_seq, mut durable) = self.wal.append_many(&events)?;

        trading_shard.post_trade(&order, &outcome.trades);

        if let Some(timeout) = self.wait_for_durability {
            durable = self.wal.wait_for_durability(last_seq, timeout);
        }

        info!(order_id, trades = outcome.trades.len(), "order processed");

        Ok((
            outcome.trades,
            DurabilityReceipt {
                sequence_id: last_seq,
                durability_confirmed: durable,
            },
        ))
    }

    /// Cancels a live order. Fails with `OrderNotFound` if the id is not
    /// resident, or silently returns `false` if `user_id` doesn't match
    /// (the caller doesn't own it).
    pub fn cancel_order(&self, order_id: OrderId, user_id: UserId) -> Result<bool, EngineError> {
        let Some(location) = self.index.get(order_id) else {
            return Err(EngineError::OrderNotFound(order_id));
        };
        let level = self
            .book
            .side(location.side)
            .get(location.price)
            .ok_or(EngineError::OrderNotFound(order_id))?;
        let Some(owner) = level.user_of(order_id) else {
            return Err(EngineError::OrderNotFound(order_id));
        };
        if owner != user_id {
            return Ok(false);
        }
        level.remove(order_id);
        self.book.side(location.side).remove_if_empty(location.price);
        self.index.remove(order_id);

        let seq = self.sequencer.next();
        self.wal.append(&Event::Cancelled {
            sequence: seq,
            order_id,
            timestamp: self.clock.now_ns(),
        })?;
        Ok(true)
    }

    /// Non-mutating best-first depth snapshot, up to `levels` per side.
    pub fn snapshot_depth(&self, levels: usize) -> (Vec<(Price, Quantity)>, Vec<(Price, Quantity)>) {
        self.book.snapshot_depth(levels)
    }

    pub fn checkpoint(&self, last_committed_timestamp: Timestamp) -> Result<(), EngineError> {
        let seq = self.wal.last_written_seq();
        self.wal.checkpoint(seq, last_committed_timestamp)?;
        Ok(())
    }

    pub fn instrument_id(&self) -> InstrumentId {
        self.instrument_id
    }

    pub fn wal(&self) -> &Wal {
        &self.wal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DurabilityModeConfig;
    use crate::trading_shard::NoopTradingShard;
    use crate::types::Side;
    use tempfile::tempdir;

    fn engine(dir: &std::path::Path) -> MatchingEngine {
        let config = EngineConfig::new(dir, DurabilityModeConfig::ZeroLoss, StpPolicy::Allow);
        MatchingEngine::new(1, 1 << 20, config, Arc::new(NoopTradingShard::new())).unwrap()
    }

    #[test]
    fn resting_limit_order_appears_in_snapshot() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let (trades, _) = engine
            .process_order(1, 10, Side::Buy, OrderType::Limit, 100, 5)
            .unwrap();
        assert!(trades.is_empty());
        let (bids, _) = engine.snapshot_depth(10);
        assert_eq!(bids, vec![(100, 5)]);
    }

    #[test]
    fn crossing_orders_produce_a_trade() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        engine
            .process_order(1, 10, Side::Sell, OrderType::Limit, 100, 5)
            .unwrap();
        let (trades, receipt) = engine
            .process_order(2, 11, Side::Buy, OrderType::Limit, 100, 5)
            .unwrap();
        assert_eq!(trades.len(), 1);
        assert!(receipt.durability_confirmed);
    }

    #[test]
    fn cancel_removes_resting_order() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        engine
            .process_order(1, 10, Side::Buy, OrderType::Limit, 100, 5)
            .unwrap();
        assert!(engine.cancel_order(1, 10).unwrap());
        let (bids, _) = engine.snapshot_depth(10);
        assert!(bids.is_empty());
    }

    #[test]
    fn cancel_by_wrong_user_is_rejected() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        engine
            .process_order(1, 10, Side::Buy, OrderType::Limit, 100, 5)
            .unwrap();
        assert!(!engine.cancel_order(1, 999).unwrap());
    }

    #[test]
    fn duplicate_order_id_is_rejected() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        engine
            .process_order(1, 10, Side::Buy, OrderType::Limit, 100, 5)
            .unwrap();
        let err = engine.process_order(1, 10, Side::Buy, OrderType::Limit, 100, 5);
        assert!(matches!(err, Err(EngineError::DuplicateOrder(1))));
    }

    #[test]
    fn sequence_ids_are_monotonic_across_taker_and_trades() {
        let dir = tempdir().unwrap();
        let engine = engine(dir.path());
        let (_, sell_receipt) = engine
            .process_order(1, 10, Side::Sell, OrderType::Limit, 100, 5)
            .unwrap();
        let (trades, buy_receipt) = engine
            .process_order(2, 11, Side::Buy, OrderType::Limit, 100, 5)
            .unwrap();
        assert!(buy_receipt.sequence_id > sell_receipt.sequence_id);
        assert_eq!(trades[0].trade_id, buy_receipt.sequence_id);
    }
}
