//! The matching kernel: price-time priority crossing of a taker order
//! against one side of the book.
//!
//! Follows the teacher's `OrderBook::match_order_with_user` structure
//! (thread-local pooled scratch vectors, best-level iteration, an STP
//! pre-pass per price level) but implements the exact loop, crossing
//! predicate, and disposition rules of the matching specification verbatim,
//! including the `MAX_ITERS` safety bound and the fill-or-kill pre-check
//! choice (run a dry pass first; abort before mutating state if the book
//! can't fill it in full).

use crate::book::OrderBook;
use crate::clock::Clock;
use crate::error::EngineError;
use crate::order::{Order, Trade};
use crate::pool::PooledIds;
use crate::stp::{check_stp_at_level, StpAction};
use crate::types::{OrderStatus, OrderType, Quantity, SequenceId, StpPolicy};

/// Default safety bound on the number of price levels crossed in one call,
/// used when no `EngineConfig::max_match_iterations` override is wired in
/// (e.g. the matching-kernel unit tests below). An order that needs more
/// than this many levels to resolve is rejected rather than looped over
/// indefinitely — a malformed book (e.g. corrupt recovery state) must fail
/// loudly, not spin.
pub const MAX_ITERS: usize = 10_000;

/// Monotonic sequence id generator for orders, trades, and book events.
pub struct SequenceGenerator {
    next: std::sync::atomic::AtomicU64,
}

impl SequenceGenerator {
    pub fn new(start: SequenceId) -> Self {
        Self {
            next: std::sync::atomic::AtomicU64::new(start),
        }
    }

    pub fn next(&self) -> SequenceId {
        self.next.fetch_add(1, std::sync::atomic::Ordering::Relaxed)
    }
}

fn crosses(taker: &Order, maker_price: crate::types::Price) -> bool {
    if matches!(taker.order_type, OrderType::Market) {
        return true;
    }
    match taker.side {
        crate::types::Side::Buy => taker.price >= maker_price,
        crate::types::Side::Sell => taker.price <= maker_price,
    }
}

/// Matches `taker` against `book`, applying self-trade prevention per
/// `stp_policy`. Returns the trades produced and the maker order ids that
/// were fully filled or cancelled by STP, so the caller can update the
/// order-id index and WAL accordingly.
///
/// Does not insert the taker's remainder into the book; the caller does
/// that for a `Limit` taker with `remaining > 0` after inspecting `taker.status`.
pub fn match_order(
    taker: &mut Order,
    book: &OrderBook,
    stp_policy: StpPolicy,
    clock: &dyn Clock,
    seq: &SequenceGenerator,
    max_iters: usize,
) -> Result<MatchOutcome, EngineError> {
    if matches!(taker.order_type, OrderType::Fok) {
        if !fok_fillable(taker, book) {
            taker.status = OrderStatus::Cancelled;
            return Ok(MatchOutcome::default());
        }
    }

    let opp = book.opposite_side(taker.side);
    let mut trades = Vec::new();
    let mut filled_makers = PooledIds::take();
    let mut cancelled_makers = PooledIds::take();
    let mut iter = 0usize;

    'outer: while taker.remaining > 0 && !opp.is_empty() {
        if iter >= max_iters {
            return Err(EngineError::InvalidOrder("MAX_ITERS exceeded while matching"));
        }
        iter += 1;

        let Some(maker_price) = opp.best_price() else {
            break;
        };
        if !crosses(taker, maker_price) {
            break;
        }
        let Some(level) = opp.get(maker_price) else {
            break;
        };

        let resident = level.fifo_with_users();
        if resident.is_empty() {
            opp.remove_if_empty(maker_price);
            continue;
        }

        for &(maker_id, maker_user_id) in &resident {
            if taker.remaining == 0 {
                break 'outer;
            }
            let Some(maker_remaining) = level.remaining_of(maker_id) else {
                continue;
            };

            if maker_remaining == 0 {
                continue;
            }

            // STP is evaluated per resident maker, matching the teacher's
            // per-level pre-pass: a self-owned maker either blocks the
            // taker, is removed, or both, before any quantity crosses.
            let action = check_stp_at_level(stp_policy, taker.user_id, &[(maker_id, maker_user_id)]);
            match action {
                StpAction::NoConflict => {}
                StpAction::CancelTaker => {
                    taker.status = OrderStatus::Cancelled;
                    break 'outer;
                }
                StpAction::CancelMaker { maker_order_ids } => {
                    for id in maker_order_ids {
                        level.remove(id);
                        cancelled_makers.push(id);
                    }
                    continue;
                }
                StpAction::CancelBoth { maker_order_id } => {
                    level.remove(maker_order_id);
                    cancelled_makers.push(maker_order_id);
                    taker.status = OrderStatus::Cancelled;
                    break 'outer;
                }
            }

            let qty: Quantity = taker.remaining.min(maker_remaining);
            level.reduce(maker_id, qty);
            taker.remaining -= qty;

            let trade = Trade {
                trade_id: seq.next(),
                instrument_id: book.instrument_id,
                maker_order_id: maker_id,
                taker_order_id: taker.id,
                maker_user_id,
                taker_user_id: taker.user_id,
                price: maker_price,
                quantity: qty,
                taker_side: taker.side,
                timestamp: clock.now_ns(),
            };
            trades.push(trade);

            if level.remaining_of(maker_id) == Some(0) {
                level.remove(maker_id);
                filled_makers.push(maker_id);
            }
        }

        if level.is_empty() {
            opp.remove_if_empty(maker_price);
        }
    }

    if taker.remaining == 0 {
        taker.status = OrderStatus::Filled;
    } else if matches!(taker.order_type, OrderType::Ioc | OrderType::Fok | OrderType::Market) {
        // A Market order that exhausts the opposite side without fully
        // filling has nowhere to rest (only Limit orders are book-eligible);
        // treat its unfilled remainder like Ioc/Fok rather than leaving it
        // Pending/PartialFilled and un-indexed.
        taker.status = OrderStatus::Cancelled;
    } else if !matches!(taker.status, OrderStatus::Cancelled) {
        taker.status = if trades.is_empty() {
            OrderStatus::Pending
        } else {
            OrderStatus::PartialFilled
        };
    }

    Ok(MatchOutcome {
        trades,
        filled_makers: filled_makers.clone(),
        cancelled_makers: cancelled_makers.clone(),
    })
}

/// Dry-run fill-or-kill check: can the book currently fill `taker` in full
/// without mutating any state? Grounded in spec choice (a): compute
/// fillable quantity against a snapshot of best levels before touching the
/// book.
fn fok_fillable(taker: &Order, book: &OrderBook) -> bool {
    let opp = book.opposite_side(taker.side);
    let mut need = taker.remaining;
    for level in opp.iter_levels() {
        if need == 0 {
            break;
        }
        if !crosses(taker, level.price) {
            break;
        }
        need -= need.min(level.total_quantity());
    }
    need == 0
}

#[derive(Default)]
pub struct MatchOutcome {
    pub trades: Vec<Trade>,
    pub filled_makers: Vec<crate::types::OrderId>,
    pub cancelled_makers: Vec<crate::types::OrderId>,
}
