//! In-process matching engine core for a single-instrument perpetual
//! futures exchange.
//!
//! The crate provides a price-time-priority limit order book, a
//! crash-durable write-ahead log with group commit and async fsync, a
//! lock-free concurrency fabric between the matching thread and the WAL
//! writer thread, and a sharding front end that routes by user and
//! instrument independently. Account and margin bookkeeping, network
//! framing, and metrics exposition are deliberately out of scope; see
//! [`trading_shard::TradingShard`] for the seam through which those
//! external systems are consulted.
//!
//! ```
//! use matching_core::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let dir = tempfile::tempdir()?;
//! let config = EngineConfig::new(dir.path(), DurabilityModeConfig::ZeroLoss, StpPolicy::Allow);
//! let engine = MatchingEngine::new(1, 1 << 20, config, Arc::new(NoopTradingShard::new()))?;
//! engine.process_order(1, 100, Side::Sell, OrderType::Limit, 42_000_000_000_000, 1_000_000)?;
//! let (trades, receipt) =
//!     engine.process_order(2, 200, Side::Buy, OrderType::Limit, 42_000_000_000_000, 1_000_000)?;
//! assert_eq!(trades.len(), 1);
//! assert!(receipt.durability_confirmed);
//! # Ok(())
//! # }
//! ```

pub mod book;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod matching;
pub mod metrics;
pub mod order;
pub mod order_index;
pub mod pool;
pub mod price_level;
pub mod recovery;
pub mod ring_buffer;
pub mod sharding;
pub mod stp;
pub mod trading_shard;
pub mod types;
pub mod wal;

pub mod prelude;
