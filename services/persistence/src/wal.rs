//! Append-only WAL writer with explicit durability
//!
//! The writer assigns LSNs and buffers encoded frames; `flush` returns only
//! after the operating system confirms the bytes are on stable storage
//! (`File::sync_all`). The engine batches all records of one request into a
//! single flush and never exposes a state transition before that flush
//! returns.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::lock::WalLock;
use crate::record::{Lsn, WalOp, WalRecord};

/// WAL store errors
///
/// Append and flush failures (full disk included) are fatal to the engine:
/// the in-flight request is never acknowledged and the process halts.
#[derive(Error, Debug)]
pub enum WalError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),

    #[error("corruption at byte offset {offset}: {detail}")]
    Corruption { offset: u64, detail: String },

    #[error("sequence gap: expected LSN {expected}, got {got}")]
    SequenceGap { expected: Lsn, got: Lsn },

    #[error("WAL already locked by another process: {path}")]
    Locked { path: PathBuf },
}

/// Append-only writer over a single WAL file.
pub struct WalWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    next_lsn: Lsn,
    staged: usize,
    /// Held for the writer's lifetime; released on drop
    _lock: WalLock,
}

impl WalWriter {
    /// Open the WAL for appending.
    ///
    /// `next_lsn` comes from recovery (highest durable LSN + 1, or 1 for a
    /// fresh log). The lock must already be held; it is consumed here so it
    /// lives exactly as long as the writer.
    pub fn open(path: impl Into<PathBuf>, next_lsn: Lsn, lock: WalLock) -> Result<Self, WalError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        debug!(path = %path.display(), next_lsn, "WAL opened for append");

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            next_lsn,
            _lock: lock,
            staged: 0,
        })
    }

    /// Stage one record, assigning it the next LSN.
    ///
    /// The record is buffered; it is not durable until [`flush`] returns.
    ///
    /// [`flush`]: WalWriter::flush
    pub fn append(&mut self, op: WalOp, timestamp: i64) -> Result<Lsn, WalError> {
        let record = WalRecord {
            lsn: self.next_lsn,
            timestamp,
            op,
        };
        let frame = record.encode()?;
        self.writer.write_all(&frame)?;

        let lsn = self.next_lsn;
        self.next_lsn += 1;
        self.staged += 1;
        Ok(lsn)
    }

    /// Flush all staged records to stable storage.
    pub fn flush(&mut self) -> Result<(), WalError> {
        if self.staged == 0 {
            return Ok(());
        }
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        debug!(records = self.staged, last_lsn = self.last_lsn(), "WAL flushed");
        self.staged = 0;
        Ok(())
    }

    /// LSN the next appended record will receive.
    pub fn next_lsn(&self) -> Lsn {
        self.next_lsn
    }

    /// Highest LSN assigned so far (0 if none).
    pub fn last_lsn(&self) -> Lsn {
        self.next_lsn - 1
    }

    /// Number of records staged since the last flush.
    pub fn staged_records(&self) -> usize {
        self.staged
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Truncate the WAL to `len` bytes, discarding a torn tail found on replay.
pub fn truncate_to(path: &Path, len: u64) -> Result<(), WalError> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(len)?;
    file.sync_all()?;
    Ok(())
}
