//! Market data events consumed by a [`Session`](crate::Session).
//!
//! These are the boundary types between the parsing collaborator (see
//! [`fix`](crate::fix)) and the book core. Timestamps are nanoseconds since
//! the Unix epoch.

use crate::error::{BookError, Result};
use crate::types::{Order, Side};

/// Subscription request type carried by a subscribe/reset event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionType {
    /// Snapshot only
    Snapshot,
    /// Snapshot followed by incremental updates
    SnapshotPlusUpdates,
    /// Disable previous subscription
    Unsubscribe,
    /// Any other code
    Other(i64),
}

impl SubscriptionType {
    /// Map a SubscriptionRequestType code.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => SubscriptionType::Snapshot,
            1 => SubscriptionType::SnapshotPlusUpdates,
            2 => SubscriptionType::Unsubscribe,
            other => SubscriptionType::Other(other),
        }
    }
}

/// Subscribe/reset request. Always clears the book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubscribeEvent {
    pub sequence_number: u64,
    pub timestamp: i64,
    pub subscription_type: SubscriptionType,
}

/// Kind of a single update entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    New,
    Delete,
}

/// One entry of an update event's group list.
///
/// `side`, `price` and `size` are mandatory for [`EntryKind::New`]; a delete
/// only needs the order id.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateEntry {
    pub kind: EntryKind,
    pub order_id: u64,
    pub side: Option<Side>,
    pub price: Option<f64>,
    pub size: Option<u64>,
}

impl UpdateEntry {
    /// A fully specified "new" entry.
    pub fn new_order(order_id: u64, side: Side, price: f64, size: u64) -> Self {
        Self {
            kind: EntryKind::New,
            order_id,
            side: Some(side),
            price: Some(price),
            size: Some(size),
        }
    }

    /// A delete entry.
    pub fn delete(order_id: u64) -> Self {
        Self {
            kind: EntryKind::Delete,
            order_id,
            side: None,
            price: None,
            size: None,
        }
    }

    /// Build the order described by a "new" entry.
    ///
    /// # Errors
    /// `MalformedEvent` if side, price or size is missing.
    pub fn to_order(&self) -> Result<Order> {
        let missing = |field: &str| {
            BookError::malformed(format!("new entry {} has no {field}", self.order_id))
        };
        let side = self.side.ok_or_else(|| missing("side"))?;
        let price = self.price.ok_or_else(|| missing("price"))?;
        let size = self.size.ok_or_else(|| missing("size"))?;
        Ok(Order::new(self.order_id, side, price, size))
    }
}

/// Incremental book update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateEvent {
    pub sequence_number: u64,
    pub timestamp: i64,
    pub entries: Vec<UpdateEntry>,
}

impl UpdateEvent {
    pub fn new(sequence_number: u64, timestamp: i64, entries: Vec<UpdateEntry>) -> Self {
        Self {
            sequence_number,
            timestamp,
            entries,
        }
    }

    /// "New" entries in event order.
    pub fn additions(&self) -> impl Iterator<Item = &UpdateEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::New)
    }

    /// "Delete" entries in event order.
    pub fn deletions(&self) -> impl Iterator<Item = &UpdateEntry> {
        self.entries.iter().filter(|e| e.kind == EntryKind::Delete)
    }
}

/// Anything else the parser passes through (heartbeats, logons, ...).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OtherEvent {
    pub sequence_number: u64,
    pub timestamp: i64,
}

/// A single event of the ordered input stream.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketEvent {
    Subscribe(SubscribeEvent),
    Update(UpdateEvent),
    Other(OtherEvent),
}

impl MarketEvent {
    /// Convenience constructor for a snapshot-plus-updates subscription.
    pub fn subscribe(sequence_number: u64, timestamp: i64) -> Self {
        MarketEvent::Subscribe(SubscribeEvent {
            sequence_number,
            timestamp,
            subscription_type: SubscriptionType::SnapshotPlusUpdates,
        })
    }

    /// Convenience constructor for an update event.
    pub fn update(sequence_number: u64, timestamp: i64, entries: Vec<UpdateEntry>) -> Self {
        MarketEvent::Update(UpdateEvent::new(sequence_number, timestamp, entries))
    }

    /// Convenience constructor for an out-of-band event.
    pub fn other(sequence_number: u64, timestamp: i64) -> Self {
        MarketEvent::Other(OtherEvent {
            sequence_number,
            timestamp,
        })
    }

    pub fn sequence_number(&self) -> u64 {
        match self {
            MarketEvent::Subscribe(e) => e.sequence_number,
            MarketEvent::Update(e) => e.sequence_number,
            MarketEvent::Other(e) => e.sequence_number,
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            MarketEvent::Subscribe(e) => e.timestamp,
            MarketEvent::Update(e) => e.timestamp,
            MarketEvent::Other(e) => e.timestamp,
        }
    }
}
