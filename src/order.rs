//! Order, trade, and event value types.
//!
//! Grounded on the teacher's `orderbook::trade` module (`TradeResult`,
//! `TradeEvent`) adapted to the spec's flat scalar model — no generic `T`
//! extra-field payload, no maker/taker fee fields (fees are out of scope).

use crate::types::{
    InstrumentId, OrderId, OrderStatus, OrderType, Price, Quantity, SequenceId, Side, Timestamp,
    UserId,
};

/// A resting or incoming order.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub instrument_id: InstrumentId,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Price,
    pub quantity: Quantity,
    pub remaining: Quantity,
    pub status: OrderStatus,
    /// Assigned by the engine's `SequenceGenerator` before the order is
    /// handed to the matching kernel; strictly greater than every id
    /// previously assigned on this shard.
    pub sequence_id: SequenceId,
    pub created_at: Timestamp,
}

impl Order {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        user_id: UserId,
        instrument_id: InstrumentId,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
        sequence_id: SequenceId,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            instrument_id,
            side,
            order_type,
            price,
            quantity,
            remaining: quantity,
            status: OrderStatus::Pending,
            sequence_id,
            created_at,
        }
    }

    pub fn is_resting_eligible(&self) -> bool {
        matches!(self.order_type, OrderType::Limit)
    }

    pub fn is_done(&self) -> bool {
        matches!(self.status, OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected)
    }

    pub fn filled_quantity(&self) -> Quantity {
        self.quantity - self.remaining
    }
}

/// A completed trade between a taker and a resting maker.
#[derive(Debug, Clone)]
pub struct Trade {
    /// Assigned by the engine's `SequenceGenerator` at the moment the trade
    /// is produced, during matching — not before, not after.
    pub trade_id: SequenceId,
    pub instrument_id: InstrumentId,
    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,
    pub maker_user_id: UserId,
    pub taker_user_id: UserId,
    pub price: Price,
    pub quantity: Quantity,
    pub taker_side: Side,
    pub timestamp: Timestamp,
}

/// An engine-level event, the unit of record appended to the WAL and
/// delivered to listeners. A tagged variant replacing the original C++
/// union-of-structs record payload.
#[derive(Debug, Clone)]
pub enum Event {
    Accepted {
        sequence: SequenceId,
        order: Order,
    },
    Rejected {
        sequence: SequenceId,
        order_id: OrderId,
        reason: &'static str,
    },
    Traded {
        sequence: SequenceId,
        trade: Trade,
    },
    Cancelled {
        sequence: SequenceId,
        order_id: OrderId,
        timestamp: Timestamp,
    },
}

impl Event {
    pub fn sequence(&self) -> SequenceId {
        match self {
            Event::Accepted { sequence, .. }
            | Event::Rejected { sequence, .. }
            | Event::Traded { sequence, .. }
            | Event::Cancelled { sequence, .. } => *sequence,
        }
    }
}
