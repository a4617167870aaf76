//! Trade execution types
//!
//! A trade records an atomic cross between a resting order and an
//! aggressor. The price is always the resting order's price.

use crate::ids::{OrderId, TradeId};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// A completed cross between two orders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    /// Buy-side order of the cross
    pub bid_order_id: OrderId,
    /// Sell-side order of the cross
    pub ask_order_id: OrderId,
    /// Execution price in paise (the resting order's price)
    pub price: Price,
    /// Executed quantity, min of both remainders
    pub qty: Quantity,
    /// Unix nanos, assigned at match time
    pub executed_at: i64,
}

impl Trade {
    /// Create a new trade with a fresh id
    pub fn new(
        bid_order_id: OrderId,
        ask_order_id: OrderId,
        price: Price,
        qty: Quantity,
        executed_at: i64,
    ) -> Self {
        Self {
            trade_id: TradeId::new(),
            bid_order_id,
            ask_order_id,
            price,
            qty,
            executed_at,
        }
    }

    /// Notional value of the trade (price times quantity)
    pub fn value(&self) -> u128 {
        u128::from(self.price.paise()) * u128::from(self.qty.get())
    }
}
