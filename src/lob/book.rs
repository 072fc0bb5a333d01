//! Full-depth order store for one symbol.
//!
//! Orders are kept per side in insertion-ordered maps keyed by id:
//! - `IndexMap` (ahash) for O(1) id lookups
//! - insertion order is the explicit tie-break when several orders share a price
//! - values are `Copy`, so clones never alias the live book

use ahash::RandomState;
use indexmap::IndexMap;

use super::depth::DepthView;
use crate::error::{BookError, Result};
use crate::types::{Order, Side};

/// Per-side order map: id -> order, in insertion order.
pub type OrderMap = IndexMap<u64, Order, RandomState>;

/// Full-depth order book.
///
/// An id lives on at most one side at a time. The book is created empty,
/// cleared in place on every subscribe/reset and mutated by update events.
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    /// Trading symbol (labelling only)
    symbol: String,

    /// Bid orders: order_id -> Order
    bids: OrderMap,

    /// Ask orders: order_id -> Order
    asks: OrderMap,
}

impl OrderBook {
    /// Create an empty book.
    ///
    /// # Example
    /// ```
    /// use depth_delta_reconstructor::OrderBook;
    ///
    /// let book = OrderBook::new("EUR/USD");
    /// assert!(book.is_empty());
    /// ```
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bids: OrderMap::default(),
            asks: OrderMap::default(),
        }
    }

    /// Trading symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Remove every order from both sides.
    pub fn reset(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    /// Insert an order under its side, keyed by id.
    ///
    /// Re-adding an existing id replaces the stored order in place (keeping
    /// its queue position). If the id rests on the opposite side it is moved.
    ///
    /// # Errors
    /// `InvalidSide` if the order's side is unresolved.
    pub fn add(&mut self, order: Order) -> Result<()> {
        let (own, other) = match order.side {
            Side::Bid => (&mut self.bids, &mut self.asks),
            Side::Ask => (&mut self.asks, &mut self.bids),
            Side::None => {
                return Err(BookError::InvalidSide(format!(
                    "order {} has no side",
                    order.id
                )))
            }
        };

        if other.shift_remove(&order.id).is_some() {
            log::debug!(
                "Order {} moved from {:?} to {:?}",
                order.id,
                order.side.opposite(),
                order.side
            );
        }

        own.insert(order.id, order);
        Ok(())
    }

    /// Remove and return the order with this id from whichever side holds it.
    ///
    /// # Errors
    /// `OrderNotFound` if neither side holds the id.
    pub fn delete(&mut self, order_id: u64) -> Result<Order> {
        self.bids
            .shift_remove(&order_id)
            .or_else(|| self.asks.shift_remove(&order_id))
            .ok_or(BookError::OrderNotFound(order_id))
    }

    /// Membership test by side + id.
    #[inline]
    pub fn contains(&self, order: &Order) -> bool {
        match order.side {
            Side::Bid => self.bids.contains_key(&order.id),
            Side::Ask => self.asks.contains_key(&order.id),
            Side::None => false,
        }
    }

    /// Look up an order by id on either side.
    pub fn get(&self, order_id: u64) -> Option<&Order> {
        self.bids.get(&order_id).or_else(|| self.asks.get(&order_id))
    }

    /// Project the best `depth` orders per side.
    pub fn depth_view(&self, depth: usize) -> DepthView {
        DepthView::from_sides(&self.symbol, depth, self.bids.values(), self.asks.values())
    }

    /// Bid side, in insertion order.
    pub fn bids(&self) -> &OrderMap {
        &self.bids
    }

    /// Ask side, in insertion order.
    pub fn asks(&self) -> &OrderMap {
        &self.asks
    }

    /// Number of live orders.
    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    /// True if no orders rest on either side.
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Number of bid orders.
    pub fn bid_count(&self) -> usize {
        self.bids.len()
    }

    /// Number of ask orders.
    pub fn ask_count(&self) -> usize {
        self.asks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_book() -> OrderBook {
        let mut book = OrderBook::new("EUR/USD");
        book.add(Order::bid(1, 20.0, 10)).unwrap();
        book.add(Order::bid(2, 19.0, 12)).unwrap();
        book.add(Order::ask(3, 22.0, 5)).unwrap();
        book.add(Order::ask(4, 23.0, 10)).unwrap();
        book
    }

    #[test]
    fn test_new_book() {
        let book = OrderBook::new("EUR/USD");
        assert_eq!(book.symbol(), "EUR/USD");
        assert!(book.is_empty());
        assert_eq!(book.len(), 0);
    }

    #[test]
    fn test_add_routes_by_side() {
        let book = sample_book();
        assert_eq!(book.bid_count(), 2);
        assert_eq!(book.ask_count(), 2);
        assert!(book.contains(&Order::bid(1, 20.0, 10)));
        assert!(!book.contains(&Order::ask(1, 20.0, 10)));
    }

    #[test]
    fn test_add_without_side_fails() {
        let mut book = OrderBook::new("EUR/USD");
        let err = book.add(Order::new(7, Side::None, 1.0, 1)).unwrap_err();
        assert!(matches!(err, BookError::InvalidSide(_)));
        assert!(book.is_empty());
    }

    #[test]
    fn test_add_moves_id_between_sides() {
        let mut book = sample_book();
        book.add(Order::ask(1, 21.0, 3)).unwrap();

        assert_eq!(book.bid_count(), 1);
        assert_eq!(book.ask_count(), 3);
        assert_eq!(book.get(1), Some(&Order::ask(1, 21.0, 3)));
    }

    #[test]
    fn test_delete_returns_order() {
        let mut book = sample_book();
        assert_eq!(book.delete(3).unwrap(), Order::ask(3, 22.0, 5));
        assert_eq!(book.delete(2).unwrap(), Order::bid(2, 19.0, 12));
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_delete_unknown_id_fails() {
        let mut book = sample_book();
        assert_eq!(book.delete(99), Err(BookError::OrderNotFound(99)));
        assert_eq!(book.len(), 4);
    }

    #[test]
    fn test_reset_clears_both_sides() {
        let mut book = sample_book();
        book.reset();
        assert!(book.is_empty());
        assert_eq!(book.symbol(), "EUR/USD");
    }

    #[test]
    fn test_clone_is_independent() {
        let mut book = sample_book();
        let snapshot = book.clone();

        book.delete(1).unwrap();
        book.add(Order::bid(5, 21.0, 1)).unwrap();

        assert_eq!(snapshot.len(), 4);
        assert!(snapshot.contains(&Order::bid(1, 20.0, 10)));
        assert!(snapshot.get(5).is_none());
    }
}
