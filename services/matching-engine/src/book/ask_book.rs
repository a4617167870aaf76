//! Ask (sell-side) price levels
//!
//! Sell orders sorted by price ascending (best ask first). BTreeMap keeps
//! iteration deterministic; the best level is the first key.

use slab::Slab;
use std::collections::BTreeMap;

use super::level::PriceLevel;
use super::node::OrderNode;
use types::numeric::Price;

/// Ask (sell) side of the book
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    /// Price levels; best ask is the lowest key
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    /// Create a new empty ask book
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

    /// Best (lowest) ask price
    pub fn best_price(&self) -> Option<Price> {
        self.levels.keys().next().copied()
    }

    /// Slab key of the head order at the best level
    pub fn best_key(&self) -> Option<usize> {
        self.levels.values().next().and_then(|l| l.peek_head())
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
            .take(depth)
            .map(|(price, level)| (*price, level.total_qty()))
            .collect()
    }

    /// Check if the ask book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of live price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
