//! Demonstrates cold-start recovery: submit a few orders, drop the engine,
//! then rebuild an identical book by replaying its write-ahead log.

use matching_core::prelude::*;
use matching_core::recovery::recover;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let dir = tempfile::tempdir()?;

    {
        let config = EngineConfig::new(dir.path(), DurabilityModeConfig::ZeroLoss, StpPolicy::Allow);
        let engine = MatchingEngine::new(1, 1 << 20, config, Arc::new(NoopTradingShard::new()))?;
        engine.process_order(1, 1, Side::Buy, OrderType::Limit, 100, 5)?;
        engine.process_order(2, 2, Side::Sell, OrderType::Limit, 110, 3)?;
        println!("live depth: {:?}", engine.snapshot_depth(10));
    }

    let config = EngineConfig::new(dir.path(), DurabilityModeConfig::ZeroLoss, StpPolicy::Allow);
    let restarted = MatchingEngine::new(1, 1 << 20, config, Arc::new(NoopTradingShard::new()))?;
    let records = restarted.wal().replay()?;
    let applied = recover(&restarted, &records)?;
    println!("recovered {applied} records");
    println!("recovered depth: {:?}", restarted.snapshot_depth(10));
    Ok(())
}
