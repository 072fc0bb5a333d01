//! Core data types for orders and book changes.
//!
//! Orders are small `Copy` values: "updating" an order is always modelled as
//! delete-old + add-new, never as in-place mutation.

use serde::{Deserialize, Serialize};

use crate::error::{BookError, Result};

/// Order side (bid or ask)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    /// Buy order (bid)
    Bid = b'B',
    /// Sell order (ask/offer)
    Ask = b'A',
    /// Unresolved side (delete entries carry only id/price/size)
    None = b'N',
}

impl Side {
    /// Map a protocol MDEntryType code to a side.
    ///
    /// `0` is a bid, `1` an offer. Anything else is rejected rather than
    /// indexed into a variant table.
    pub fn from_code(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Side::Bid),
            1 => Ok(Side::Ask),
            other => Err(BookError::InvalidSide(format!("unknown side code {other}"))),
        }
    }

    /// Parse side from a byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'B' => Some(Side::Bid),
            b'A' => Some(Side::Ask),
            b'N' => Some(Side::None),
            _ => None,
        }
    }

    /// Convert to byte representation.
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Check if this is a bid.
    #[inline(always)]
    pub fn is_bid(self) -> bool {
        matches!(self, Side::Bid)
    }

    /// Check if this is an ask.
    #[inline(always)]
    pub fn is_ask(self) -> bool {
        matches!(self, Side::Ask)
    }

    /// The opposite side, if resolved.
    pub fn opposite(self) -> Option<Self> {
        match self {
            Side::Bid => Some(Side::Ask),
            Side::Ask => Some(Side::Bid),
            Side::None => None,
        }
    }
}

/// A resting order.
///
/// Equality is structural over all four fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique order identifier (MDEntryID)
    pub id: u64,

    /// Book side
    pub side: Side,

    /// Limit price
    pub price: f64,

    /// Order size
    pub size: u64,
}

impl Order {
    /// Create a new order.
    pub fn new(id: u64, side: Side, price: f64, size: u64) -> Self {
        Self {
            id,
            side,
            price,
            size,
        }
    }

    /// Create a bid.
    pub fn bid(id: u64, price: f64, size: u64) -> Self {
        Self::new(id, Side::Bid, price, size)
    }

    /// Create an ask.
    pub fn ask(id: u64, price: f64, size: u64) -> Self {
        Self::new(id, Side::Ask, price, size)
    }

    /// True if both orders rest at exactly the same price.
    #[inline]
    pub fn same_price(&self, other: &Order) -> bool {
        self.price == other.price
    }
}

/// Classification of a visible change in the depth window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Order appeared in the window
    New,
    /// Same-priced replacement of a removed order
    Update,
    /// Order left the window
    Delete,
}

impl Action {
    /// Upper-case label used in exports.
    pub fn name(&self) -> &'static str {
        match self {
            Action::New => "NEW",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
        }
    }
}

/// One entry of a change list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub order: Order,
    pub action: Action,
}

impl Change {
    pub fn new(order: Order, action: Action) -> Self {
        Self { order, action }
    }

    pub fn new_order(order: Order) -> Self {
        Self::new(order, Action::New)
    }

    pub fn update(order: Order) -> Self {
        Self::new(order, Action::Update)
    }

    pub fn delete(order: Order) -> Self {
        Self::new(order, Action::Delete)
    }
}

/// An explicit add or delete carried by an update event, as applied to the book.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputChange {
    /// Order added by the event
    New(Order),
    /// Order removed by the event (only the id is reported)
    Delete { order_id: u64 },
}

impl InputChange {
    /// The order id this entry refers to.
    pub fn order_id(&self) -> u64 {
        match self {
            InputChange::New(order) => order.id,
            InputChange::Delete { order_id } => *order_id,
        }
    }

    /// The action this entry represents.
    pub fn action(&self) -> Action {
        match self {
            InputChange::New(_) => Action::New,
            InputChange::Delete { .. } => Action::Delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Side tests
    // =========================================================================

    #[test]
    fn test_side_from_code() {
        assert_eq!(Side::from_code(0), Ok(Side::Bid));
        assert_eq!(Side::from_code(1), Ok(Side::Ask));
        assert!(matches!(Side::from_code(2), Err(BookError::InvalidSide(_))));
        assert!(matches!(Side::from_code(-1), Err(BookError::InvalidSide(_))));
    }

    #[test]
    fn test_side_checks() {
        assert!(Side::Bid.is_bid());
        assert!(!Side::Ask.is_bid());
        assert!(Side::Ask.is_ask());
        assert!(!Side::None.is_bid());
        assert!(!Side::None.is_ask());
        assert_eq!(Side::Bid.opposite(), Some(Side::Ask));
        assert_eq!(Side::None.opposite(), None);
    }

    #[test]
    fn test_side_byte_roundtrip() {
        for side in [Side::Bid, Side::Ask, Side::None] {
            assert_eq!(Side::from_byte(side.to_byte()), Some(side));
        }
        assert_eq!(Side::from_byte(b'X'), None);
    }

    // =========================================================================
    // Order / Change tests
    // =========================================================================

    #[test]
    fn test_order_structural_equality() {
        let a = Order::bid(1, 1.11821, 1_000_000);
        assert_eq!(a, Order::bid(1, 1.11821, 1_000_000));
        assert_ne!(a, Order::bid(1, 1.11821, 2_000_000));
        assert_ne!(a, Order::ask(1, 1.11821, 1_000_000));
        assert!(a.same_price(&Order::ask(9, 1.11821, 5)));
    }

    #[test]
    fn test_input_change_accessors() {
        let add = InputChange::New(Order::ask(5, 22.0, 10));
        let del = InputChange::Delete { order_id: 6 };
        assert_eq!(add.order_id(), 5);
        assert_eq!(add.action(), Action::New);
        assert_eq!(del.order_id(), 6);
        assert_eq!(del.action(), Action::Delete);
    }

    #[test]
    fn test_change_serializes_with_action_name() {
        let change = Change::update(Order::bid(2, 19.0, 12));
        let json = serde_json::to_string(&change).unwrap();
        assert!(json.contains("\"action\":\"Update\""));
        assert_eq!(Action::Update.name(), "UPDATE");
    }
}
