//! Price level with an intrusive FIFO queue
//!
//! Orders resting at one price are chained into a doubly-linked queue
//! through their slab nodes. The head is the oldest order and the next to
//! match, new arrivals attach behind the tail, and a cancel splices its
//! node out in O(1) without walking the queue. Combined with the monotone
//! arrival sequence this enforces strict time priority within the level.

use slab::Slab;

use super::node::OrderNode;
use types::numeric::Price;

/// All orders resting at a single price.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// Price for this level (paise)
    pub price: Price,

    /// Total remaining quantity across the level's orders
    total_qty: u64,

    /// Oldest order (matched first), slab key
    head: Option<usize>,

    /// Newest order (appended last), slab key
    tail: Option<usize>,

    /// Number of orders at this level
    order_count: usize,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new(price: Price) -> Self {
        Self {
            price,
            total_qty: 0,
            head: None,
            tail: None,
            order_count: 0,
        }
    }

    /// Check if the price level is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }

    /// Total remaining quantity at this level
    #[inline]
    pub fn total_qty(&self) -> u64 {
        self.total_qty
    }

    /// Number of orders at this level
    #[inline]
    pub fn len(&self) -> usize {
        self.order_count
    }

    /// Oldest order's slab key; the next to be matched
    #[inline]
    pub fn peek_head(&self) -> Option<usize> {
        self.head
    }

    /// Append an order at the tail of the queue (time priority).
    ///
    /// `key` must come from the owning book's slab; indexing panics on a
    /// stale key, which is an index-consistency violation.
    pub fn push_back(&mut self, key: usize, orders: &mut Slab<OrderNode>) {
        let displaced = self.tail.replace(key);
        let qty = {
            let node = &mut orders[key];
            node.prev = displaced;
            node.next = None;
            node.remaining()
        };

        // The displaced tail gains a successor; an empty queue gains a head
        match displaced {
            Some(old_tail) => orders[old_tail].next = Some(key),
            None => self.head = Some(key),
        }

        self.order_count += 1;
        self.total_qty += qty;
    }

    /// Unlink an order from anywhere in the queue.
    ///
    /// Returns the removed order's remaining quantity. Stale keys panic,
    /// as in [`push_back`](PriceLevel::push_back).
    pub fn remove(&mut self, key: usize, orders: &mut Slab<OrderNode>) -> u64 {
        let (qty, prev, next) = {
            let node = &mut orders[key];
            (node.remaining(), node.prev.take(), node.next.take())
        };
        self.bridge(prev, next, orders);

        self.order_count -= 1;
        self.total_qty -= qty;
        qty
    }

    /// Make `prev` and `next` adjacent after the node between them left,
    /// updating the head/tail anchors when either side is the queue end.
    fn bridge(&mut self, prev: Option<usize>, next: Option<usize>, orders: &mut Slab<OrderNode>) {
        match prev {
            Some(p) => orders[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => orders[n].prev = prev,
            None => self.tail = prev,
        }
    }

    /// Account for a partial fill of one of the level's orders.
    pub fn reduce_qty(&mut self, filled_qty: u64) {
        self.total_qty -= filled_qty;
    }
}
