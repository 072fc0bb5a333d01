//! Depth-limited projection of an [`OrderBook`](super::OrderBook).

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::types::{Order, Side};

/// Top-N bids and asks at a point in time.
///
/// Bids are ordered best (highest price) first, asks best (lowest price)
/// first. Orders sharing a price keep the book's insertion order. A view owns
/// copies of its orders; later mutation of the book cannot change it.
///
/// Equality ignores ordering within a side: two views are equal when they
/// hold the same orders (by id, structurally equal) for the same symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthView {
    /// Trading symbol
    symbol: String,

    /// Configured depth (N)
    depth: usize,

    /// Bids (highest to lowest)
    bids: Vec<Order>,

    /// Asks (lowest to highest)
    asks: Vec<Order>,
}

impl DepthView {
    /// Select the best `depth` orders of each side.
    pub(crate) fn from_sides<'a>(
        symbol: &str,
        depth: usize,
        bids: impl Iterator<Item = &'a Order>,
        asks: impl Iterator<Item = &'a Order>,
    ) -> Self {
        let mut bids: Vec<Order> = bids.copied().collect();
        let mut asks: Vec<Order> = asks.copied().collect();

        // Stable sorts: equal prices keep insertion order
        bids.sort_by(|a, b| b.price.total_cmp(&a.price));
        asks.sort_by(|a, b| a.price.total_cmp(&b.price));
        bids.truncate(depth);
        asks.truncate(depth);

        Self {
            symbol: symbol.to_string(),
            depth,
            bids,
            asks,
        }
    }

    /// An empty view.
    pub fn empty(symbol: impl Into<String>, depth: usize) -> Self {
        Self {
            symbol: symbol.into(),
            depth,
            bids: Vec::new(),
            asks: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Bids, highest price first.
    pub fn bids(&self) -> &[Order] {
        &self.bids
    }

    /// Asks, lowest price first.
    pub fn asks(&self) -> &[Order] {
        &self.asks
    }

    /// Best bid price.
    #[inline]
    pub fn best_bid(&self) -> Option<f64> {
        self.bids.first().map(|o| o.price)
    }

    /// Best ask price.
    #[inline]
    pub fn best_ask(&self) -> Option<f64> {
        self.asks.first().map(|o| o.price)
    }

    /// Number of orders in the view.
    pub fn len(&self) -> usize {
        self.bids.len() + self.asks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Membership by side + id.
    pub fn contains(&self, order: &Order) -> bool {
        self.side(order.side)
            .map(|orders| orders.iter().any(|o| o.id == order.id))
            .unwrap_or(false)
    }

    /// Membership by id on either side.
    pub fn contains_id(&self, order_id: u64) -> bool {
        self.get(order_id).is_some()
    }

    /// Membership by structural equality.
    pub fn contains_exact(&self, order: &Order) -> bool {
        self.get(order.id).map_or(false, |o| o == order)
    }

    /// Look up an order by id on either side.
    pub fn get(&self, order_id: u64) -> Option<&Order> {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .find(|o| o.id == order_id)
    }

    /// All orders keyed by id.
    pub fn by_id(&self) -> AHashMap<u64, Order> {
        self.bids
            .iter()
            .chain(self.asks.iter())
            .map(|o| (o.id, *o))
            .collect()
    }

    /// All orders by ascending price: bids worst to best, then asks best to
    /// worst. Orders sharing a price keep insertion order on both sides. This
    /// is the scan order used when classifying changes.
    pub fn iter_by_price(&self) -> impl Iterator<Item = &Order> {
        // Stable: reverses price groups, not the orders within a group
        let mut bids: Vec<&Order> = self.bids.iter().collect();
        bids.sort_by(|a, b| a.price.total_cmp(&b.price));
        bids.into_iter().chain(self.asks.iter())
    }

    fn side(&self, side: Side) -> Option<&[Order]> {
        match side {
            Side::Bid => Some(&self.bids),
            Side::Ask => Some(&self.asks),
            Side::None => None,
        }
    }
}

fn same_orders(a: &[Order], b: &[Order]) -> bool {
    a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| y.id == x.id && y == x))
}

impl PartialEq for DepthView {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
            && same_orders(&self.bids, &other.bids)
            && same_orders(&self.asks, &other.asks)
    }
}
