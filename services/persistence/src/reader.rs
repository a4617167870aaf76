//! Sequential WAL reader with corruption detection
//!
//! Replays records in LSN order, validating checksums and LSN continuity.
//! A damaged frame at the end of the file is a torn tail: replay stops at
//! the preceding record and reports the byte offset so the tail can be
//! truncated. A damaged frame with intact frames after it is mid-log
//! corruption and is fatal; no record past it may be consumed.

use std::fs;
use std::path::Path;
use tracing::warn;

use crate::record::{FrameError, Lsn, WalRecord};
use crate::wal::WalError;

/// Description of a torn tail found during replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TornTail {
    /// Byte offset where the torn frame starts; truncate to here.
    pub offset: u64,
    pub detail: String,
}

/// Result of a full replay.
#[derive(Debug)]
pub struct ReplayOutcome {
    /// All intact records, LSN 1 ..= highest durable
    pub records: Vec<WalRecord>,
    /// Present when the file ends in a torn frame
    pub torn_tail: Option<TornTail>,
}

/// Sequential reader over a single WAL file.
pub struct WalReader {
    data: Vec<u8>,
    pos: usize,
    last_lsn: Option<Lsn>,
}

impl WalReader {
    /// Open a reader over the WAL file. A missing file reads as empty.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            data,
            pos: 0,
            last_lsn: None,
        })
    }

    /// Read all intact records, detecting a torn tail.
    ///
    /// Errors on mid-log corruption or an LSN discontinuity.
    pub fn read_all(&mut self) -> Result<ReplayOutcome, WalError> {
        let mut records = Vec::new();

        loop {
            if self.pos >= self.data.len() {
                return Ok(ReplayOutcome {
                    records,
                    torn_tail: None,
                });
            }

            let offset = self.pos as u64;
            match WalRecord::decode(&self.data[self.pos..]) {
                Ok((record, consumed)) => {
                    let expected = self.last_lsn.map_or(1, |l| l + 1);
                    if record.lsn != expected {
                        return Err(WalError::SequenceGap {
                            expected,
                            got: record.lsn,
                        });
                    }
                    self.last_lsn = Some(record.lsn);
                    self.pos += consumed;
                    records.push(record);
                }
                Err(err) => {
                    return self.classify_failure(records, offset, err);
                }
            }
        }
    }

    /// Highest LSN read so far (None before the first record).
    pub fn last_lsn(&self) -> Option<Lsn> {
        self.last_lsn
    }

    /// Decide whether a frame failure is a torn tail or fatal corruption.
    fn classify_failure(
        &self,
        records: Vec<WalRecord>,
        offset: u64,
        err: FrameError,
    ) -> Result<ReplayOutcome, WalError> {
        let remaining = &self.data[self.pos..];
        let is_tail = match &err {
            // A frame that extends past EOF, or whose length prefix is
            // garbage, can only be the tail: nothing after it is parseable.
            FrameError::Truncated { .. } | FrameError::ImplausibleLength(_) => true,
            // A fully present frame with a bad checksum is a torn tail only
            // when it is the last frame in the file.
            FrameError::ChecksumMismatch { .. } => WalRecord::frame_len(remaining)
                .map(|len| self.pos + len >= self.data.len())
                .unwrap_or(true),
            // CRC passed but the payload is undecodable: real corruption.
            FrameError::UnsupportedVersion(_) | FrameError::Malformed(_) => false,
        };

        if is_tail {
            warn!(offset, %err, "torn tail detected, replay stops at LSN {:?}", self.last_lsn);
            Ok(ReplayOutcome {
                records,
                torn_tail: Some(TornTail {
                    offset,
                    detail: err.to_string(),
                }),
            })
        } else {
            Err(WalError::Corruption {
                offset,
                detail: err.to_string(),
            })
        }
    }
}
