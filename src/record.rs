//! Output records, one per processed update event.

use serde::{Deserialize, Serialize};

use crate::lob::DepthView;
use crate::types::{Change, InputChange, Order};

/// Everything needed to report one update event.
///
/// Created once by the [`Session`](crate::Session) and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookDelta {
    /// Sequence number of the update event
    pub sequence_number: u64,

    /// Adds and deletes carried by the event, as applied
    pub input_changes: Vec<InputChange>,

    /// Depth view after the event
    pub view: DepthView,

    /// Visible changes (deletes, then updates, then news)
    pub changes: Vec<Change>,

    /// Timestamp of the reference subscribe/reset event (ns since epoch)
    pub start_time: i64,

    /// Timestamp of this update (ns since epoch)
    pub end_time: i64,

    /// First record after a subscribe/reset
    pub is_book_refresh: bool,
}

impl BookDelta {
    /// Time between the reference request and this update, in milliseconds.
    pub fn elapsed_ms(&self) -> i64 {
        (self.end_time - self.start_time) / 1_000_000
    }

    /// Resulting bids, highest first.
    pub fn bids(&self) -> &[Order] {
        self.view.bids()
    }

    /// Resulting asks, lowest first.
    pub fn asks(&self) -> &[Order] {
        self.view.asks()
    }

    /// True if the visible window did not change.
    pub fn is_unchanged(&self) -> bool {
        self.changes.is_empty()
    }
}
