//! Order lifecycle types
//!
//! An order is created by an insert request, mutated only by fills or a
//! price modify, and leaves the book on full fill or cancel. The running
//! notional (sum of fill price times fill quantity) is kept on the order so
//! the average traded price can be computed exactly on read instead of
//! accumulating rounding error fill by fill.

use crate::ids::OrderId;
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
///
/// Wire encoding on the ingress queue is `+1` for buy, `-1` for sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Decode the `+1` / `-1` queue encoding
    pub fn from_wire(value: i8) -> Option<Self> {
        match value {
            1 => Some(Side::Buy),
            -1 => Some(Side::Sell),
            _ => None,
        }
    }

    /// Encode as the `+1` / `-1` queue representation
    pub fn to_wire(&self) -> i8 {
        match self {
            Side::Buy => 1,
            Side::Sell => -1,
        }
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Accepted, no fills yet
    Open,
    /// Partially matched
    PartiallyFilled,
    /// Completely matched (terminal)
    Filled,
    /// Cancelled by the user (terminal)
    Cancelled,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

/// Canonical book entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    /// Limit price in paise; mutable via modify only
    pub price: Price,
    /// Set on insert, immutable afterwards
    pub original_qty: Quantity,
    /// Monotone non-decreasing, never exceeds `original_qty`
    pub traded_qty: Quantity,
    /// Running sum of fill price times fill quantity
    pub notional: u128,
    pub status: OrderStatus,
    /// Time priority within a price level; renewed on modify
    pub arrival_seq: u64,
    pub created_at: i64, // Unix nanos
    pub updated_at: i64, // Unix nanos
}

impl Order {
    /// Create a new open order
    pub fn new(
        id: OrderId,
        side: Side,
        price: Price,
        original_qty: Quantity,
        arrival_seq: u64,
        timestamp: i64,
    ) -> Self {
        Self {
            id,
            side,
            price,
            original_qty,
            traded_qty: Quantity::zero(),
            notional: 0,
            status: OrderStatus::Open,
            arrival_seq,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Quantity still open on the book
    pub fn remaining(&self) -> u64 {
        self.original_qty.get() - self.traded_qty.get()
    }

    /// Check if the order may rest on the book
    pub fn is_live(&self) -> bool {
        matches!(self.status, OrderStatus::Open | OrderStatus::PartiallyFilled)
    }

    /// Check if the order is completely filled
    pub fn is_filled(&self) -> bool {
        self.traded_qty == self.original_qty
    }

    /// Integer average traded price, `⌊notional / traded_qty⌋`
    ///
    /// Undefined (None) until the first fill.
    pub fn avg_traded_price(&self) -> Option<Price> {
        if self.traded_qty.is_zero() {
            return None;
        }
        let avg = self.notional / u128::from(self.traded_qty.get());
        Price::try_new(avg as u64)
    }

    /// Apply a fill at `price` for `qty`, transitioning status.
    ///
    /// # Panics
    /// Panics if the fill would exceed the remaining quantity or the order
    /// is not live; both are book invariant violations.
    pub fn apply_fill(&mut self, qty: Quantity, price: Price, timestamp: i64) {
        assert!(self.is_live(), "fill applied to non-live order");
        assert!(
            qty.get() <= self.remaining(),
            "fill would exceed remaining quantity"
        );

        self.traded_qty = self.traded_qty + qty;
        self.notional += u128::from(price.paise()) * u128::from(qty.get());
        self.status = if self.is_filled() {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.updated_at = timestamp;
    }

    /// Cancel the order
    ///
    /// # Panics
    /// Panics if the order is already in a terminal state.
    pub fn cancel(&mut self, timestamp: i64) {
        assert!(!self.status.is_terminal(), "cannot cancel terminal order");
        self.status = OrderStatus::Cancelled;
        self.updated_at = timestamp;
    }

    /// Re-price for a modify; time priority is forfeited.
    pub fn reprice(&mut self, new_price: Price, new_arrival_seq: u64, timestamp: i64) {
        self.price = new_price;
        self.arrival_seq = new_arrival_seq;
        self.updated_at = timestamp;
    }
}
