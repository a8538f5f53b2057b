//! Write-ahead log: bit-exact binary records, group commit, async fsync,
//! and crash recovery by replay.
//!
//! Grounded on the teacher's `orderbook::sequencer` subsystem (journal
//! trait + mmap `FileJournal`) for the on-disk architecture, and on
//! `original_source/versions/production_safe_optimized/include/core/wal.h`
//! for the exact durability semantics (group commit, async sync, batch
//! append, checkpoint/truncate).

pub mod journal;
pub mod record;
pub mod writer;

pub use crate::error::WalError;
pub use writer::{DurabilityMode, Wal, WalHandle};
