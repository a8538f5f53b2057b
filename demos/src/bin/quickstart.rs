//! Minimal end-to-end walkthrough: construct one matching shard, submit a
//! resting order, cross it, and inspect the resulting trade and depth.

use matching_core::prelude::*;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let dir = tempfile::tempdir()?;
    let config = EngineConfig::new(dir.path(), DurabilityModeConfig::ZeroLoss, StpPolicy::Allow);
    let engine = MatchingEngine::new(1, 1 << 20, config, Arc::new(NoopTradingShard::new()))?;

    engine.process_order(1, 100, Side::Sell, OrderType::Limit, price_from_decimal(42_000.0)?, qty_from_decimal(1.5)?)?;
    let (trades, receipt) = engine.process_order(
        2,
        200,
        Side::Buy,
        OrderType::Limit,
        price_from_decimal(42_100.0)?,
        qty_from_decimal(1.0)?,
    )?;

    for trade in &trades {
        println!(
            "trade: {} @ {} (sequence {})",
            decimal_from_qty(trade.quantity),
            decimal_from_price(trade.price),
            receipt.sequence_id
        );
    }

    let (bids, asks) = engine.snapshot_depth(5);
    println!("bids: {bids:?}");
    println!("asks: {asks:?}");
    Ok(())
}
