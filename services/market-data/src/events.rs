//! Broadcast event wire shapes
//!
//! These are the JSON payloads consumers see. Prices stay in integer
//! paise on the wire; depth levels are `[price, total_qty]` pairs sorted
//! best-first.

use serde::{Deserialize, Serialize};
use types::ids::{OrderId, TradeId};
use types::trade::Trade;

/// A trade, published on every fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// LSN of the trade's WAL record, for consumer deduplication
    pub lsn: u64,
    pub trade_id: TradeId,
    /// Unix nanos at match time
    pub ts: i64,
    pub price_paise: u64,
    pub qty: u64,
    pub bid_order_id: OrderId,
    pub ask_order_id: OrderId,
}

impl TradeEvent {
    /// Build the wire event from a trade and the LSN of its record.
    pub fn from_trade(lsn: u64, trade: &Trade) -> Self {
        Self {
            lsn,
            trade_id: trade.trade_id,
            ts: trade.executed_at,
            price_paise: trade.price.paise(),
            qty: trade.qty.get(),
            bid_order_id: trade.bid_order_id,
            ask_order_id: trade.ask_order_id,
        }
    }
}

/// Aggregate book depth, published once per cadence tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEvent {
    /// The view reflects all WAL records up to this LSN
    pub lsn: u64,
    /// Unix nanos when the snapshot was taken
    pub ts: i64,
    /// `[price_paise, total_qty]` levels, highest price first
    pub bids: Vec<(u64, u64)>,
    /// `[price_paise, total_qty]` levels, lowest price first
    pub asks: Vec<(u64, u64)>,
}

/// Everything the emitter broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum MarketEvent {
    Trade(TradeEvent),
    Snapshot(SnapshotEvent),
}

impl MarketEvent {
    /// Event type label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            MarketEvent::Trade(_) => "Trade",
            MarketEvent::Snapshot(_) => "Snapshot",
        }
    }

    /// The LSN the event carries.
    pub fn lsn(&self) -> u64 {
        match self {
            MarketEvent::Trade(e) => e.lsn,
            MarketEvent::Snapshot(e) => e.lsn,
        }
    }
}
