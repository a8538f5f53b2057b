//! Lock-free counters and per-thread latency histograms.
//!
//! Counters are plain relaxed atomics, read-only exposition, never touched
//! by a lock. Latency uses a per-thread `hdrhistogram::Histogram`, merged
//! on read — promoted here from the teacher's dev-dependency (used only in
//! benches) to a normal dependency, since this specification's metrics
//! component is in-core, not an external Prometheus exporter.

use hdrhistogram::Histogram;
use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Read-only, lock-free counters for one matching shard.
#[derive(Default)]
pub struct ShardCounters {
    pub orders_processed: AtomicU64,
    pub trades_executed: AtomicU64,
    pub wal_bytes_written: AtomicU64,
    pub fsync_count: AtomicU64,
    pub fsync_time_ns: AtomicU64,
}

impl ShardCounters {
    pub fn record_order(&self) {
        self.orders_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trades(&self, count: u64) {
        self.trades_executed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_wal_bytes(&self, bytes: u64) {
        self.wal_bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_fsync(&self, duration_ns: u64) {
        self.fsync_count.fetch_add(1, Ordering::Relaxed);
        self.fsync_time_ns.fetch_add(duration_ns, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            orders_processed: self.orders_processed.load(Ordering::Relaxed),
            trades_executed: self.trades_executed.load(Ordering::Relaxed),
            wal_bytes_written: self.wal_bytes_written.load(Ordering::Relaxed),
            fsync_count: self.fsync_count.load(Ordering::Relaxed),
            fsync_time_ns: self.fsync_time_ns.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CounterSnapshot {
    pub orders_processed: u64,
    pub trades_executed: u64,
    pub wal_bytes_written: u64,
    pub fsync_count: u64,
    pub fsync_time_ns: u64,
}

/// Registry of per-thread `process_order` latency histograms, merged on
/// demand by the collector. The hot path only ever touches its own
/// thread-local histogram — no cross-thread contention.
pub struct LatencyHistograms {
    registry: Mutex<Vec<Histogram<u64>>>,
}

thread_local! {
    static LOCAL: RefCell<Option<Histogram<u64>>> = const { RefCell::new(None) };
}

impl Default for LatencyHistograms {
    fn default() -> Self {
        Self {
            registry: Mutex::new(Vec::new()),
        }
    }
}

impl LatencyHistograms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one `process_order` latency sample, in nanoseconds, on the
    /// calling thread's local histogram.
    pub fn record(&self, latency_ns: u64) {
        LOCAL.with(|cell| {
            let mut slot = cell.borrow_mut();
            if slot.is_none() {
                *slot = Some(
                    Histogram::new_with_bounds(1, 60_000_000_000, 3)
                        .expect("invalid histogram bounds"),
                );
            }
            let hist = slot.as_mut().unwrap();
            let _ = hist.record(latency_ns.max(1));
        });
    }

    /// Publishes the calling thread's histogram into the shared registry so
    /// a later `merged()` call picks up its samples. Call this periodically,
    /// not per-record, to avoid lock contention on the hot path.
    pub fn publish(&self) {
        LOCAL.with(|cell| {
            if let Some(hist) = cell.borrow().as_ref() {
                self.registry
                    .lock()
                    .expect("histogram registry poisoned")
                    .push(hist.clone());
            }
        });
    }

    /// Merges every published per-thread histogram into one for reporting.
    /// Pull-based: the collector calls this; it never blocks the hot path.
    pub fn merged(&self) -> Histogram<u64> {
        let registry = self.registry.lock().expect("histogram registry poisoned");
        let mut merged = Histogram::new_with_bounds(1, 60_000_000_000, 3).unwrap();
        for hist in registry.iter() {
            merged.add(hist).expect("incompatible histogram bounds");
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let counters = ShardCounters::default();
        counters.record_order();
        counters.record_trades(3);
        let snap = counters.snapshot();
        assert_eq!(snap.orders_processed, 1);
        assert_eq!(snap.trades_executed, 3);
    }

    #[test]
    fn histogram_merges_published_samples() {
        let hists = LatencyHistograms::new();
        hists.record(1000);
        hists.record(2000);
        hists.publish();
        let merged = hists.merged();
        assert_eq!(merged.len(), 2);
    }
}
