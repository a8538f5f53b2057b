//! Convenience re-exports of the most commonly used types.
//!
//! ```
//! use matching_core::prelude::*;
//! ```

pub use crate::book::{OrderBook, OrderBookSide};
pub use crate::config::{DurabilityModeConfig, EngineConfig};
pub use crate::engine::{DurabilityReceipt, MatchingEngine};
pub use crate::error::{EngineError, WalError};
pub use crate::order::{Event, Order, Trade};
pub use crate::sharding::{matching_shard_id, trading_shard_id, ShardStats, ShardedFrontEnd};
pub use crate::trading_shard::{NoopTradingShard, TradingShard};
pub use crate::types::{
    decimal_from_price, decimal_from_qty, price_from_decimal, qty_from_decimal, InstrumentId,
    OrderId, OrderStatus, OrderType, Price, Quantity, SequenceId, Side, StpPolicy, Timestamp,
    UserId,
};
pub use crate::wal::{DurabilityMode, Wal};
