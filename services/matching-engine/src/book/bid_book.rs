//! Bid (buy-side) price levels
//!
//! Buy orders sorted by price descending (best bid first). BTreeMap keeps
//! iteration deterministic; the best level is the last key.

use slab::Slab;
use std::collections::BTreeMap;

use super::level::PriceLevel;
use super::node::OrderNode;
use types::numeric::Price;

/// Bid (buy) side of the book
#[derive(Debug, Clone, Default)]
pub struct BidBook {
    /// Price levels; best bid is the highest key
    levels: BTreeMap<Price, PriceLevel>,
}

impl BidBook {
    /// Create a new empty bid book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Append an order at the tail of its price level
    pub fn insert(&mut self, key: usize, price: Price, orders: &mut Slab<OrderNode>) {
        let level = self
            .levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price));
        level.push_back(key, orders);
    }

    /// Unlink an order, dropping the level if it empties
    pub fn remove(&mut self, key: usize, price: Price, orders: &mut Slab<OrderNode>) {
        if let Some(level) = self.levels.get_mut(&price) {
            level.remove(key, orders);
            if level.is_empty() {
                self.levels.remove(&price);
            }
        }
    }

    /// Best (highest) bid price
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next_back().copied()
    }

    /// Slab key of the head order at the best level
    pub fn best_key(&self) -> Option<usize> {
        self.levels.values().next_back().and_then(|l| l.peek_head())
    }

    /// Account for a partial fill at a level
    pub fn reduce_at(&mut self, price: Price, qty: u64) {
        if let Some(level) = self.levels.get_mut(&price) {
            level.reduce_qty(qty);
        }
    }

    /// Aggregate depth, best-first, up to `depth` levels
    pub fn depth(&self, depth: usize) -> Vec<(Price, u64)> {
        self.levels
            .iter()
            .rev()
            .take(depth)
            .map(|(price, level)| (*price, level.total_qty()))
            .collect()
    }

    /// Check if the bid book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of live price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::OrderId;
    use types::numeric::Quantity;
    use types::order::{Order, Side};

    fn add_order(
        orders: &mut Slab<OrderNode>,
        book: &mut BidBook,
        price: u64,
        qty: u64,
        seq: u64,
    ) -> usize {
        let order = Order::new(
            OrderId::new(),
            Side::Buy,
            Price::new(price),
            Quantity::new(qty),
            seq,
            0,
        );
        let price = order.price;
        let key = orders.insert(OrderNode::new(order));
        book.insert(key, price, orders);
        key
    }

    #[test]
    fn test_best_is_highest_price() {
        let mut orders = Slab::new();
        let mut book = BidBook::new();

        add_order(&mut orders, &mut book, 9_900, 10, 1);
        let best = add_order(&mut orders, &mut book, 10_100, 10, 2);
        add_order(&mut orders, &mut book, 10_000, 10, 3);

        assert_eq!(book.best_price(), Some(Price::new(10_100)));
        assert_eq!(book.best_key(), Some(best));
        assert_eq!(book.level_count(), 3);
    }

    #[test]
    fn test_remove_drops_empty_level() {
        let mut orders = Slab::new();
        let mut book = BidBook::new();

        let k1 = add_order(&mut orders, &mut book, 10_100, 10, 1);
        add_order(&mut orders, &mut book, 10_000, 10, 2);

        book.remove(k1, Price::new(10_100), &mut orders);
        assert_eq!(book.level_count(), 1);
        assert_eq!(book.best_price(), Some(Price::new(10_000)));
    }

    #[test]
    fn test_depth_best_first() {
        let mut orders = Slab::new();
        let mut book = BidBook::new();

        add_order(&mut orders, &mut book, 10_000, 5, 1);
        add_order(&mut orders, &mut book, 10_100, 7, 2);
        add_order(&mut orders, &mut book, 9_900, 3, 3);
        add_order(&mut orders, &mut book, 10_100, 2, 4);

        let depth = book.depth(2);
        assert_eq!(depth, vec![(Price::new(10_100), 9), (Price::new(10_000), 5)]);
    }

    #[test]
    fn test_same_price_shares_level() {
        let mut orders = Slab::new();
        let mut book = BidBook::new();

        let k1 = add_order(&mut orders, &mut book, 10_000, 5, 1);
        add_order(&mut orders, &mut book, 10_000, 7, 2);

        assert_eq!(book.level_count(), 1);
        // Head is the first arrival
        assert_eq!(book.best_key(), Some(k1));
    }
}
