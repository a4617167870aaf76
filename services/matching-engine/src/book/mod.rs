//! Two-sided price-time-priority book
//!
//! Order data lives in a shared slab; each side keeps price levels in a
//! BTreeMap of intrusive FIFO queues, and a HashMap maps order id to slab
//! key so cancel and modify splice the node out in O(1) without traversal.
//!
//! Empty price levels are removed immediately, so `best` returns `None`
//! only when a side holds no live orders at all.

pub mod ask_book;
pub mod bid_book;
pub mod level;
pub mod node;

pub use ask_book::AskBook;
pub use bid_book::BidBook;
pub use level::PriceLevel;
pub use node::OrderNode;

use slab::Slab;
use std::collections::HashMap;
use thiserror::Error;

use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::{Order, Side};

/// Book-level failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookError {
    #[error("order {order_id} is already live on the book")]
    DuplicateOrder { order_id: OrderId },

    #[error("order {order_id} not found on the book")]
    UnknownOrder { order_id: OrderId },
}

/// Result of applying a fill to a resting order
#[derive(Debug, Clone)]
pub struct FillOutcome {
    /// Post-fill snapshot of the order
    pub order: Order,
    /// True when the order filled completely and left the book
    pub removed: bool,
}

/// The two-sided limit order book.
#[derive(Debug, Clone, Default)]
pub struct Book {
    /// Shared storage for all live orders
    orders: Slab<OrderNode>,
    /// Order id to slab key, for O(1) cancel/modify
    index: HashMap<OrderId, usize>,
    bids: BidBook,
    asks: AskBook,
}

impl Book {
    /// Create an empty book
    pub fn new() -> Self {
        Self {
            orders: Slab::new(),
            index: HashMap::new(),
            bids: BidBook::new(),
            asks: AskBook::new(),
        }
    }

    /// Insert a live order at the tail of its price level.
    pub fn insert(&mut self, order: Order) -> Result<(), BookError> {
        if self.index.contains_key(&order.id) {
            return Err(BookError::DuplicateOrder { order_id: order.id });
        }
        debug_assert!(order.is_live(), "inserted order must be live");
        debug_assert!(order.remaining() > 0, "inserted order must have remainder");

        let id = order.id;
        let price = order.price;
        let side = order.side;
        let key = self.orders.insert(OrderNode::new(order));
        self.index.insert(id, key);
        match side {
            Side::Buy => self.bids.insert(key, price, &mut self.orders),
            Side::Sell => self.asks.insert(key, price, &mut self.orders),
        }
        Ok(())
    }

    /// Remove an order from the book, returning it unchanged.
    pub fn remove(&mut self, order_id: &OrderId) -> Result<Order, BookError> {
        let key = *self
            .index
            .get(order_id)
            .ok_or(BookError::UnknownOrder { order_id: *order_id })?;
        let (price, side) = {
            let node = &self.orders[key];
            (node.order.price, node.order.side)
        };
        match side {
            Side::Buy => self.bids.remove(key, price, &mut self.orders),
            Side::Sell => self.asks.remove(key, price, &mut self.orders),
        }
        self.index.remove(order_id);
        Ok(self.orders.remove(key).order)
    }

    /// Cancel then re-insert at a new price with renewed time priority.
    ///
    /// Identity, original quantity, fills, and notional all survive.
    pub fn reseat(
        &mut self,
        order_id: &OrderId,
        new_price: Price,
        new_arrival_seq: u64,
        timestamp: i64,
    ) -> Result<(), BookError> {
        let mut order = self.remove(order_id)?;
        order.reprice(new_price, new_arrival_seq, timestamp);
        self.insert(order)
    }

    /// Look up a live order by id
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.index.get(order_id).map(|key| &self.orders[*key].order)
    }

    /// Check whether an order is live on the book
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.index.contains_key(order_id)
    }

    /// Head order of the best price level on `side`
    pub fn best(&self, side: Side) -> Option<&Order> {
        let key = match side {
            Side::Buy => self.bids.best_key(),
            Side::Sell => self.asks.best_key(),
        }?;
        Some(&self.orders[key].order)
    }

    /// Best (highest) bid price
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.best_price()
    }

    /// Best (lowest) ask price
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.best_price()
    }

    /// Apply a fill to a resting order; pops it from the book when it
    /// fills completely.
    pub fn apply_fill(
        &mut self,
        order_id: &OrderId,
        qty: Quantity,
        price: Price,
        timestamp: i64,
    ) -> Result<FillOutcome, BookError> {
        let key = *self
            .index
            .get(order_id)
            .ok_or(BookError::UnknownOrder { order_id: *order_id })?;

        let (side, level_price, filled) = {
            let node = &mut self.orders[key];
            node.order.apply_fill(qty, price, timestamp);
            (node.order.side, node.order.price, node.order.is_filled())
        };

        match side {
            Side::Buy => self.bids.reduce_at(level_price, qty.get()),
            Side::Sell => self.asks.reduce_at(level_price, qty.get()),
        }

        if filled {
            match side {
                Side::Buy => self.bids.remove(key, level_price, &mut self.orders),
                Side::Sell => self.asks.remove(key, level_price, &mut self.orders),
            }
            self.index.remove(order_id);
            let order = self.orders.remove(key).order;
            Ok(FillOutcome {
                order,
                removed: true,
            })
        } else {
            Ok(FillOutcome {
                order: self.orders[key].order.clone(),
                removed: false,
            })
        }
    }

    /// Aggregate depth on `side`, best-first, up to `depth` levels
    pub fn depth(&self, side: Side, depth: usize) -> Vec<(Price, u64)> {
        match side {
            Side::Buy => self.bids.depth(depth),
            Side::Sell => self.asks.depth(depth),
        }
    }

    /// Total number of live orders
    pub fn order_count(&self) -> usize {
        self.index.len()
    }

    /// Check if the book holds no live orders
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterate over all live orders (unordered)
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter().map(|(_, node)| &node.order)
    }

    /// Panic if the book is crossed; called after every completed request.
    pub fn assert_not_crossed(&self) {
        if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
            assert!(bid < ask, "book is crossed: bid {} >= ask {}", bid, ask);
        }
    }
}
