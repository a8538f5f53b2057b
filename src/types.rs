//! Scalar types and fixed-point scaling for the matching core.
//!
//! All prices and quantities are fixed-point integers. Floats never appear
//! on the hot path; the only place a `f64` exists is at the edge, converting
//! to/from a human-readable decimal via [`price_from_decimal`] and friends.

use std::fmt;

/// Scale factor for [`Price`]: one unit of price is `1 / PRICE_SCALE`.
pub const PRICE_SCALE: i64 = 1_000_000_000;
/// Scale factor for [`Quantity`]: one unit of quantity is `1 / QTY_SCALE`.
pub const QTY_SCALE: i64 = 1_000_000;

/// Fixed-point price, scaled by [`PRICE_SCALE`].
pub type Price = i64;
/// Fixed-point quantity, scaled by [`QTY_SCALE`].
pub type Quantity = i64;
/// Globally unique order identifier, assigned by the caller.
pub type OrderId = u64;
/// Account identifier, assigned by the caller.
pub type UserId = u64;
/// Instrument identifier, assigned by the caller.
pub type InstrumentId = u32;
/// Nanosecond timestamp, monotonic within a shard.
pub type Timestamp = i64;
/// Strictly increasing sequence number assigned at WAL append time.
pub type SequenceId = u64;

/// Order type, determining how aggressively an order seeks to cross the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderType {
    /// Rests on the book at its limit price if it doesn't fully cross.
    Limit,
    /// Crosses at the best available price(s) regardless of limit.
    Market,
    /// Immediate-or-cancel: fills what it can immediately, cancels the rest.
    Ioc,
    /// Fill-or-kill: fills completely immediately, or not at all.
    Fok,
}

/// Which side of the book an order or trade leg sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    Pending,
    PartialFilled,
    Filled,
    Cancelled,
    Rejected,
}

/// Self-trade prevention policy applied when a taker would match its own resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum StpPolicy {
    /// No self-trade prevention; self-trades are allowed.
    #[default]
    Allow,
    /// Cancel the remaining taker quantity, leave the maker resting.
    CancelTaker,
    /// Cancel the resting maker order, let the taker continue matching.
    CancelMaker,
    /// Cancel both the taker remainder and the maker order.
    CancelBoth,
}

/// Error converting between a decimal `f64` and a fixed-point scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleError(pub(crate) &'static str);

impl fmt::Display for ScaleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scale conversion error: {}", self.0)
    }
}

impl std::error::Error for ScaleError {}

/// Converts a decimal price (e.g. `42123.50`) into fixed-point [`Price`].
pub fn price_from_decimal(value: f64) -> Result<Price, ScaleError> {
    decimal_to_scaled(value, PRICE_SCALE).ok_or(ScaleError("price out of range"))
}

/// Converts a fixed-point [`Price`] back into a decimal `f64`.
pub fn decimal_from_price(price: Price) -> f64 {
    price as f64 / PRICE_SCALE as f64
}

/// Converts a decimal quantity into fixed-point [`Quantity`].
pub fn qty_from_decimal(value: f64) -> Result<Quantity, ScaleError> {
    decimal_to_scaled(value, QTY_SCALE).ok_or(ScaleError("quantity out of range"))
}

/// Converts a fixed-point [`Quantity`] back into a decimal `f64`.
pub fn decimal_from_qty(qty: Quantity) -> f64 {
    qty as f64 / QTY_SCALE as f64
}

fn decimal_to_scaled(value: f64, scale: i64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = value * scale as f64;
    if scaled > i64::MAX as f64 || scaled < i64::MIN as f64 {
        return None;
    }
    Some(scaled.round() as i64)
}
