//! Error types for the matching core.
//!
//! Grounded on the teacher's `OrderBookError` enum, but expressed with
//! `thiserror` instead of a hand-rolled `Display` impl — the teacher lists
//! `thiserror` as a dependency without using it; this crate actually uses it.

use crate::types::{InstrumentId, OrderId};
use thiserror::Error;

/// Errors surfaced by order submission, cancellation, and recovery.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {0} already exists")]
    DuplicateOrder(OrderId),

    #[error("invalid order: {0}")]
    InvalidOrder(&'static str),

    #[error("instrument {0} not served by this shard")]
    WrongShard(InstrumentId),

    #[error("fill-or-kill order {0} could not be filled in full")]
    FokUnfillable(OrderId),

    #[error("ring buffer full, order {0} rejected")]
    QueueFull(OrderId),

    #[error("engine is shutting down")]
    ShuttingDown,

    #[error("trading shard rejected order {0}: {1}")]
    ShardRejected(OrderId, String),

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(&'static str),

    #[error(transparent)]
    Wal(#[from] WalError),
}

/// Errors surfaced by the write-ahead log.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WalError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("corrupt record at sequence {sequence}: expected crc {expected:#010x}, got {actual:#010x}")]
    CorruptRecord {
        sequence: u64,
        expected: u32,
        actual: u32,
    },

    #[error("record too large: {record_bytes} bytes exceeds segment size {segment_bytes}")]
    RecordTooLarge {
        record_bytes: usize,
        segment_bytes: usize,
    },

    #[error("invalid segment header at {path}: {message}")]
    InvalidSegment { path: String, message: String },

    #[error("sequence {0} not found in any retained segment")]
    SequenceNotFound(u64),

    #[error("async fsync worker has stopped")]
    WorkerStopped,
}

impl From<std::io::Error> for WalError {
    fn from(source: std::io::Error) -> Self {
        WalError::Io {
            path: String::new(),
            source,
        }
    }
}
