//! Crash recovery — rebuild the book from the WAL
//!
//! Replays records in LSN order against an empty book. Fills are
//! reconstructed from `Trade` records, which re-accrues each order's
//! notional exactly; `OrderUpdate` records are cross-checked against the
//! rebuilt state so silent divergence aborts recovery instead of
//! propagating. A torn tail is truncated before the writer reopens the
//! file.

use std::cmp;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use persistence::reader::WalReader;
use persistence::record::{Lsn, WalOp, WalRecord};
use persistence::wal::{self, WalError};

use crate::book::{Book, BookError};

/// Recovery failures; all fatal.
#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("replay inconsistency at LSN {lsn}: {detail}")]
    Inconsistent { lsn: Lsn, detail: String },
}

/// State rebuilt from the log.
#[derive(Debug)]
pub struct RecoveredState {
    pub book: Book,
    /// Highest durable LSN (0 for an empty log)
    pub last_lsn: Lsn,
    /// Arrival-sequence high-water mark
    pub arrival_seq: u64,
    pub records_replayed: u64,
    /// True when a torn tail was found and truncated
    pub tail_truncated: bool,
}

/// Summary of a recovery run, without the book itself.
#[derive(Debug, Clone)]
pub struct RecoveryReport {
    pub last_lsn: Lsn,
    pub arrival_seq: u64,
    pub records_replayed: u64,
    pub tail_truncated: bool,
    pub live_orders: usize,
}

impl RecoveredState {
    /// Summarize for logging once the book has been handed to the engine.
    pub fn report(&self) -> RecoveryReport {
        RecoveryReport {
            last_lsn: self.last_lsn,
            arrival_seq: self.arrival_seq,
            records_replayed: self.records_replayed,
            tail_truncated: self.tail_truncated,
            live_orders: self.book.order_count(),
        }
    }
}

/// Replay the WAL at `wal_path` into a fresh book.
///
/// Runs before the ingress queue consumer opens; the WAL lock must already
/// be held by the caller.
pub fn recover(wal_path: &Path) -> Result<RecoveredState, RecoveryError> {
    let mut reader = WalReader::open(wal_path)?;
    let outcome = reader.read_all()?;

    let tail_truncated = if let Some(tail) = &outcome.torn_tail {
        warn!(
            offset = tail.offset,
            detail = %tail.detail,
            "truncating torn WAL tail"
        );
        wal::truncate_to(wal_path, tail.offset)?;
        true
    } else {
        false
    };

    let mut book = Book::new();
    let mut arrival_seq = 0u64;
    let mut last_lsn = 0;
    for record in &outcome.records {
        apply(&mut book, &mut arrival_seq, record)?;
        last_lsn = record.lsn;
    }

    info!(
        records_replayed = outcome.records.len(),
        last_lsn,
        live_orders = book.order_count(),
        tail_truncated,
        "recovery complete"
    );

    Ok(RecoveredState {
        book,
        last_lsn,
        arrival_seq,
        records_replayed: outcome.records.len() as u64,
        tail_truncated,
    })
}

/// Apply one record's effect to the book being rebuilt.
fn apply(book: &mut Book, arrival_seq: &mut u64, record: &WalRecord) -> Result<(), RecoveryError> {
    let lsn = record.lsn;
    match &record.op {
        WalOp::OrderInsert(order) => {
            *arrival_seq = cmp::max(*arrival_seq, order.arrival_seq);
            // Pre-match snapshot; subsequent Trade records replay the fills
            book.insert(order.clone()).map_err(|e| inconsistent(lsn, e))?;
        }
        WalOp::OrderModify {
            order_id,
            new_price,
            new_arrival_seq,
        } => {
            *arrival_seq = cmp::max(*arrival_seq, *new_arrival_seq);
            book.reseat(order_id, *new_price, *new_arrival_seq, record.timestamp)
                .map_err(|e| inconsistent(lsn, e))?;
        }
        WalOp::OrderCancel { order_id } => {
            book.remove(order_id).map_err(|e| inconsistent(lsn, e))?;
        }
        WalOp::Trade(trade) => {
            book.apply_fill(&trade.bid_order_id, trade.qty, trade.price, trade.executed_at)
                .map_err(|e| inconsistent(lsn, e))?;
            book.apply_fill(&trade.ask_order_id, trade.qty, trade.price, trade.executed_at)
                .map_err(|e| inconsistent(lsn, e))?;
        }
        WalOp::OrderUpdate {
            order_id,
            traded_qty,
            status,
            ..
        } => {
            // Consequence record: the fill itself was applied by the Trade.
            // Cross-check the rebuilt order; absence means it filled and
            // left the book, which the status must agree with.
            match book.get(order_id) {
                Some(order) => {
                    if order.traded_qty.get() != *traded_qty || order.status != *status {
                        return Err(RecoveryError::Inconsistent {
                            lsn,
                            detail: format!(
                                "order {} replayed to traded_qty={} status={:?}, record says traded_qty={} status={:?}",
                                order_id,
                                order.traded_qty.get(),
                                order.status,
                                traded_qty,
                                status
                            ),
                        });
                    }
                }
                None => {
                    if !status.is_terminal() {
                        return Err(RecoveryError::Inconsistent {
                            lsn,
                            detail: format!(
                                "order {} absent from the rebuilt book but record status is {:?}",
                                order_id, status
                            ),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

fn inconsistent(lsn: Lsn, err: BookError) -> RecoveryError {
    RecoveryError::Inconsistent {
        lsn,
        detail: err.to_string(),
    }
}
