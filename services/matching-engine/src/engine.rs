//! Sequential matching engine
//!
//! Consumes one request at a time: validate, stage WAL records, mutate the
//! book, flush once, then release results. Nothing a request produced is
//! observable (trade events, acknowledgment) before its WAL flush returns.
//!
//! Redelivered requests are absorbed by a bounded recent-request-id cache
//! that replays the retained reply without touching the WAL or the book.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use persistence::lock::WalLock;
use persistence::record::{Lsn, WalOp};
use persistence::wal::{WalError, WalWriter};
use types::errors::RejectReason;
use types::ids::{OrderId, RequestId};
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};
use types::trade::Trade;

use crate::book::{Book, BookError};
use crate::matching::crossing;
use crate::recovery::{self, RecoveryError};
use crate::requests::{EngineRequest, ExecutionReport, Reply, RequestKind, TradeFill};

/// Fatal engine failures; the process halts without acknowledging the
/// in-flight request.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),

    #[error("book error: {0}")]
    Book(#[from] BookError),

    #[error("recovery error: {0}")]
    Recovery(#[from] RecoveryError),
}

/// Engine tuning knobs
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// How many recent request ids are retained for idempotent redelivery
    pub dedup_window: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            dedup_window: 10_000,
        }
    }
}

/// Aggregate liquidity per price level, tagged with the LSN it reflects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepthSnapshot {
    /// All WAL records up to this LSN are included in the view
    pub lsn: Lsn,
    pub timestamp: i64,
    /// Best-first (highest price first)
    pub bids: Vec<(Price, u64)>,
    /// Best-first (lowest price first)
    pub asks: Vec<(Price, u64)>,
}

/// Bounded cache of recent request outcomes for at-least-once redelivery.
struct ReplyCache {
    window: usize,
    order: VecDeque<RequestId>,
    replies: HashMap<RequestId, Reply>,
}

impl ReplyCache {
    fn new(window: usize) -> Self {
        Self {
            window,
            order: VecDeque::with_capacity(window.min(1024)),
            replies: HashMap::new(),
        }
    }

    fn get(&self, request_id: &RequestId) -> Option<Reply> {
        self.replies.get(request_id).cloned()
    }

    fn insert(&mut self, request_id: RequestId, reply: Reply) {
        self.order.push_back(request_id);
        self.replies.insert(request_id, reply);
        while self.order.len() > self.window {
            if let Some(evicted) = self.order.pop_front() {
                self.replies.remove(&evicted);
            }
        }
    }
}

/// The sequential dispatcher over book and WAL.
pub struct MatchingEngine {
    book: Book,
    wal: WalWriter,
    arrival_seq: u64,
    replies: ReplyCache,
}

impl MatchingEngine {
    /// Build an engine over an already-recovered book.
    pub fn with_state(book: Book, arrival_seq: u64, wal: WalWriter, options: EngineOptions) -> Self {
        Self {
            book,
            wal,
            arrival_seq,
            replies: ReplyCache::new(options.dedup_window),
        }
    }

    /// Open the WAL under its lock, replay it, and return a ready engine.
    pub fn open(
        wal_path: &Path,
        options: EngineOptions,
    ) -> Result<(Self, recovery::RecoveryReport), EngineError> {
        let lock = WalLock::acquire(wal_path)?;
        let recovered = recovery::recover(wal_path)?;
        let report = recovered.report();
        let wal = WalWriter::open(wal_path, recovered.last_lsn + 1, lock)?;
        let engine = Self::with_state(recovered.book, recovered.arrival_seq, wal, options);
        Ok((engine, report))
    }

    /// Process one request to completion.
    ///
    /// Validation failures come back as rejected replies; only durability
    /// and invariant failures surface as errors.
    pub fn process(&mut self, request: EngineRequest, now: i64) -> Result<ExecutionReport, EngineError> {
        if let Some(reply) = self.replies.get(&request.request_id) {
            debug!(request_id = %request.request_id, "duplicate request, replaying retained reply");
            return Ok(ExecutionReport {
                reply,
                trades: Vec::new(),
                duplicate: true,
            });
        }

        let request_id = request.request_id;
        let report = match request.kind {
            RequestKind::Insert {
                order_id,
                side,
                price_paise,
                qty,
            } => self.process_insert(request_id, order_id, side, price_paise, qty, now)?,
            RequestKind::Modify {
                order_id,
                new_price_paise,
            } => self.process_modify(request_id, order_id, new_price_paise, now)?,
            RequestKind::Cancel { order_id } => self.process_cancel(request_id, order_id, now)?,
        };

        self.book.assert_not_crossed();
        self.replies.insert(request_id, report.reply.clone());
        Ok(report)
    }

    /// Aggregate depth of both sides, tagged with the current LSN.
    pub fn depth_snapshot(&self, depth: usize, now: i64) -> DepthSnapshot {
        DepthSnapshot {
            lsn: self.wal.last_lsn(),
            timestamp: now,
            bids: self.book.depth(Side::Buy, depth),
            asks: self.book.depth(Side::Sell, depth),
        }
    }

    /// The live book (read-only)
    pub fn book(&self) -> &Book {
        &self.book
    }

    /// Highest LSN durably assigned
    pub fn last_lsn(&self) -> Lsn {
        self.wal.last_lsn()
    }

    /// Current arrival-sequence high-water mark
    pub fn arrival_seq(&self) -> u64 {
        self.arrival_seq
    }

    // ── Request handlers ────────────────────────────────────────────

    fn process_insert(
        &mut self,
        request_id: RequestId,
        order_id: Option<OrderId>,
        side: i8,
        price_paise: u64,
        qty: u64,
        now: i64,
    ) -> Result<ExecutionReport, EngineError> {
        let side = match Side::from_wire(side) {
            Some(side) => side,
            None => {
                return Ok(ExecutionReport::rejected(
                    request_id,
                    &RejectReason::UnknownSide(side),
                ))
            }
        };
        let price = match Price::try_new(price_paise) {
            Some(price) => price,
            None => return Ok(ExecutionReport::rejected(request_id, &RejectReason::InvalidPrice)),
        };
        let qty = match Quantity::try_new(qty) {
            Some(qty) => qty,
            None => {
                return Ok(ExecutionReport::rejected(
                    request_id,
                    &RejectReason::InvalidQuantity,
                ))
            }
        };
        let order_id = order_id.unwrap_or_default();
        if self.book.contains(&order_id) {
            return Ok(ExecutionReport::rejected(
                request_id,
                &RejectReason::DuplicateOrder { order_id },
            ));
        }

        self.arrival_seq += 1;
        let mut order = Order::new(order_id, side, price, qty, self.arrival_seq, now);

        self.wal.append(WalOp::OrderInsert(order.clone()), now)?;
        let trades = self.run_matching(&mut order, now)?;
        let rested = order.remaining() > 0;
        if rested {
            self.book.insert(order)?;
        }
        self.wal.flush()?;

        debug!(
            %order_id,
            trades = trades.len(),
            rested,
            "insert processed"
        );
        Ok(ExecutionReport {
            reply: Reply::ok(request_id),
            trades,
            duplicate: false,
        })
    }

    fn process_modify(
        &mut self,
        request_id: RequestId,
        order_id: Option<OrderId>,
        new_price_paise: u64,
        now: i64,
    ) -> Result<ExecutionReport, EngineError> {
        let order_id = match order_id {
            Some(order_id) => order_id,
            None => {
                return Ok(ExecutionReport::rejected(
                    request_id,
                    &RejectReason::MissingOrderId,
                ))
            }
        };
        let new_price = match Price::try_new(new_price_paise) {
            Some(price) => price,
            None => return Ok(ExecutionReport::rejected(request_id, &RejectReason::InvalidPrice)),
        };
        if !self.book.contains(&order_id) {
            return Ok(ExecutionReport::rejected(
                request_id,
                &RejectReason::UnknownOrder { order_id },
            ));
        }

        // Time priority is forfeited on every modify
        self.arrival_seq += 1;
        let new_arrival_seq = self.arrival_seq;
        self.wal.append(
            WalOp::OrderModify {
                order_id,
                new_price,
                new_arrival_seq,
            },
            now,
        )?;

        let mut order = self.book.remove(&order_id)?;
        order.reprice(new_price, new_arrival_seq, now);
        let trades = self.run_matching(&mut order, now)?;
        if order.remaining() > 0 {
            self.book.insert(order)?;
        }
        self.wal.flush()?;

        debug!(%order_id, %new_price, trades = trades.len(), "modify processed");
        Ok(ExecutionReport {
            reply: Reply::ok(request_id),
            trades,
            duplicate: false,
        })
    }

    fn process_cancel(
        &mut self,
        request_id: RequestId,
        order_id: Option<OrderId>,
        now: i64,
    ) -> Result<ExecutionReport, EngineError> {
        let order_id = match order_id {
            Some(order_id) => order_id,
            None => {
                return Ok(ExecutionReport::rejected(
                    request_id,
                    &RejectReason::MissingOrderId,
                ))
            }
        };
        if !self.book.contains(&order_id) {
            return Ok(ExecutionReport::rejected(
                request_id,
                &RejectReason::UnknownOrder { order_id },
            ));
        }

        self.wal.append(WalOp::OrderCancel { order_id }, now)?;
        let mut order = self.book.remove(&order_id)?;
        order.cancel(now);
        self.wal.flush()?;

        debug!(%order_id, "cancel processed");
        Ok(ExecutionReport {
            reply: Reply::ok(request_id),
            trades: Vec::new(),
            duplicate: false,
        })
    }

    // ── Matching loop ───────────────────────────────────────────────

    /// Match the aggressor against the opposite side until it no longer
    /// crosses or is exhausted. Runs to completion without yielding.
    fn run_matching(
        &mut self,
        aggressor: &mut Order,
        now: i64,
    ) -> Result<Vec<TradeFill>, EngineError> {
        let mut fills = Vec::new();

        while aggressor.remaining() > 0 {
            let (resting_id, resting_price, resting_remaining) =
                match self.book.best(aggressor.side.opposite()) {
                    Some(resting)
                        if crossing::crosses(aggressor.side, aggressor.price, resting.price) =>
                    {
                        (resting.id, resting.price, resting.remaining())
                    }
                    _ => break,
                };

            let qty = Quantity::new(aggressor.remaining().min(resting_remaining));
            // Trade executes at the resting order's price, never the aggressor's
            let (bid_order_id, ask_order_id) = match aggressor.side {
                Side::Buy => (aggressor.id, resting_id),
                Side::Sell => (resting_id, aggressor.id),
            };
            let trade = Trade::new(bid_order_id, ask_order_id, resting_price, qty, now);

            aggressor.apply_fill(qty, resting_price, now);
            let resting = self.book.apply_fill(&resting_id, qty, resting_price, now)?;

            let lsn = self.wal.append(WalOp::Trade(trade.clone()), now)?;
            self.wal.append(Self::order_update(aggressor), now)?;
            self.wal.append(Self::order_update(&resting.order), now)?;

            fills.push(TradeFill { lsn, trade });
        }

        if !fills.is_empty() {
            info!(
                aggressor = %aggressor.id,
                trades = fills.len(),
                remaining = aggressor.remaining(),
                "matched"
            );
        }
        Ok(fills)
    }

    fn order_update(order: &Order) -> WalOp {
        WalOp::OrderUpdate {
            order_id: order.id,
            traded_qty: order.traded_qty.get(),
            avg_traded_price: order.avg_traded_price(),
            status: order.status,
        }
    }
}
