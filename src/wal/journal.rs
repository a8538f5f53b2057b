//! Segment-rotated, memory-mapped journal file.
//!
//! Grounded on the teacher's `sequencer::file_journal::SegmentWriter`: an
//! mmap-backed append log that rotates to a new segment file once the
//! current one fills, named by its starting sequence number. The payload
//! encoding differs from the teacher's (JSON): here it is the bit-exact
//! layout in `wal::record`.

use crate::error::WalError;
use crate::wal::record::{decode_record, RawRecord};
use memmap2::{MmapMut, MmapOptions};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Default segment size: 256 MiB, matching the teacher's `file_journal`.
pub const DEFAULT_SEGMENT_SIZE: u64 = 256 * 1024 * 1024;

fn segment_name(start_sequence: u64) -> String {
    format!("segment-{start_sequence:020}.journal")
}

/// One active, append-only, memory-mapped segment file.
pub struct Segment {
    path: PathBuf,
    file: File,
    mmap: MmapMut,
    len: u64,
    capacity: u64,
}

impl Segment {
    pub fn create(dir: &Path, start_sequence: u64, capacity: u64) -> Result<Self, WalError> {
        fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        let path = dir.join(segment_name(start_sequence));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        file.set_len(capacity).map_err(|e| io_err(&path, e))?;
        let mmap = unsafe { MmapOptions::new().map_mut(&file) }.map_err(|e| io_err(&path, e))?;
        Ok(Self {
            path,
            file,
            mmap,
            len: 0,
            capacity,
        })
    }

    pub fn open_existing(path: PathBuf) -> Result<(Self, u64), WalError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        let capacity = file.metadata().map_err(|e| io_err(&path, e))?.len();
        let mmap = unsafe { MmapOptions::new().map_mut(&file) }.map_err(|e| io_err(&path, e))?;
        let mut cursor = 0u64;
        let mut last_sequence = 0u64;
        loop {
            match decode_record(&mmap[cursor as usize..])? {
                Some((_, consumed)) => {
                    last_sequence += 1;
                    cursor += consumed as u64;
                }
                None => break,
            }
        }
        Ok((
            Self {
                path,
                file,
                mmap,
                len: cursor,
                capacity,
            },
            last_sequence,
        ))
    }

    pub fn remaining(&self) -> u64 {
        self.capacity - self.len
    }

    /// Writes `bytes` at the current append offset. Caller must have checked
    /// `remaining() >= bytes.len()`.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), WalError> {
        let start = self.len as usize;
        let end = start + bytes.len();
        self.mmap[start..end].copy_from_slice(bytes);
        self.len = end as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.mmap.flush().map_err(|e| io_err(&self.path, e))
    }

    pub fn read_all(&self) -> Result<Vec<RawRecord>, WalError> {
        let mut out = Vec::new();
        let mut cursor = 0usize;
        while let Some((record, consumed)) = decode_record(&self.mmap[cursor..])? {
            out.push(record);
            cursor += consumed;
        }
        Ok(out)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn io_err(path: &Path, source: std::io::Error) -> WalError {
    WalError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Appends records across segment boundaries, rotating to a new segment
/// once the active one can't hold the next record.
///
/// `records_written` is purely a segment-naming counter (new segments are
/// named by the record count preceding them) — it is not the WAL-level
/// sequence id. That id lives on the `Event` itself and is assigned by the
/// engine's `SequenceGenerator`, never minted here.
pub struct SegmentedJournal {
    dir: PathBuf,
    segment_capacity: u64,
    active: Segment,
    records_written: u64,
}

impl SegmentedJournal {
    pub fn open(dir: impl Into<PathBuf>, segment_capacity: u64) -> Result<Self, WalError> {
        let dir = dir.into();
        let mut segments = Self::list_segment_files(&dir)?;
        segments.sort();
        if let Some(last) = segments.pop() {
            let (segment, records_in_segment) = Segment::open_existing(last)?;
            let records_written = Self::start_sequence_of(segment.path()) + records_in_segment;
            Ok(Self {
                dir,
                segment_capacity,
                active: segment,
                records_written,
            })
        } else {
            let active = Segment::create(&dir, 0, segment_capacity)?;
            Ok(Self {
                dir,
                segment_capacity,
                active,
                records_written: 0,
            })
        }
    }

    fn list_segment_files(dir: &Path) -> Result<Vec<PathBuf>, WalError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
            let entry = entry.map_err(|e| io_err(dir, e))?;
            if entry.path().extension().and_then(|e| e.to_str()) == Some("journal") {
                out.push(entry.path());
            }
        }
        Ok(out)
    }

    fn start_sequence_of(path: &Path) -> u64 {
        path.file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix("segment-"))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }

    /// Appends one already-encoded record, rotating segments as needed. The
    /// record's WAL-level sequence id is already baked into its payload by
    /// the caller; this only tracks where to rotate the next segment file.
    pub fn append(&mut self, encoded: &[u8]) -> Result<(), WalError> {
        if encoded.len() as u64 > self.segment_capacity {
            return Err(WalError::RecordTooLarge {
                record_bytes: encoded.len(),
                segment_bytes: self.segment_capacity as usize,
            });
        }
        if self.active.remaining() < encoded.len() as u64 {
            self.active.flush()?;
            self.active = Segment::create(&self.dir, self.records_written, self.segment_capacity)?;
        }
        self.active.append(encoded)?;
        self.records_written += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), WalError> {
        self.active.flush()
    }

    /// Replays every record across every segment, oldest first.
    pub fn replay_all(&self) -> Result<Vec<RawRecord>, WalError> {
        let mut files = Self::list_segment_files(&self.dir)?;
        files.sort();
        let mut out = Vec::new();
        for path in files {
            let (segment, _) = Segment::open_existing(path)?;
            out.extend(segment.read_all()?);
        }
        Ok(out)
    }
}

/// Mostly for direct unit access to the append-with-fsync helper used by a
/// plain `File` writer when mmap mode is disabled.
pub fn sync_file(file: &File) -> Result<(), WalError> {
    file.sync_data().map_err(WalError::from)
}

pub fn write_last_committed(dir: &Path, timestamp: i64) -> Result<(), WalError> {
    let path = dir.join("last_committed");
    let mut f = File::create(&path).map_err(|e| io_err(&path, e))?;
    f.write_all(&timestamp.to_le_bytes()).map_err(|e| io_err(&path, e))?;
    f.sync_data().map_err(|e| io_err(&path, e))
}

pub fn read_last_committed(dir: &Path) -> Result<Option<i64>, WalError> {
    let path = dir.join("last_committed");
    if !path.exists() {
        return Ok(None);
    }
    let bytes = fs::read(&path).map_err(|e| io_err(&path, e))?;
    if bytes.len() < 8 {
        return Ok(None);
    }
    Ok(Some(i64::from_le_bytes(bytes[0..8].try_into().unwrap())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::record::{encode_record, RecordType};
    use tempfile::tempdir;

    #[test]
    fn append_and_replay_round_trip() {
        let dir = tempdir().unwrap();
        let mut journal = SegmentedJournal::open(dir.path(), 4096).unwrap();
        for i in 0..5u64 {
            let payload = i.to_le_bytes();
            let encoded = encode_record(RecordType::Checkpoint, i as i64, &payload);
            journal.append(&encoded).unwrap();
        }
        journal.flush().unwrap();
        let records = journal.replay_all().unwrap();
        assert_eq!(records.len(), 5);
    }

    #[test]
    fn rotates_to_new_segment_when_full() {
        let dir = tempdir().unwrap();
        let mut journal = SegmentedJournal::open(dir.path(), 64).unwrap();
        for i in 0..20u64 {
            let payload = i.to_le_bytes();
            let encoded = encode_record(RecordType::Checkpoint, i as i64, &payload);
            journal.append(&encoded).unwrap();
        }
        let files = SegmentedJournal::list_segment_files(dir.path()).unwrap();
        assert!(files.len() > 1);
    }
}
