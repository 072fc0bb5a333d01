//! # Depth-Delta-Reconstructor
//!
//! Order book reconstruction and top-N depth change detection from market data
//! update streams.
//!
//! The library maintains a full-depth, order-level book for one symbol from a
//! stream of subscribe, update and out-of-band events. After every update it
//! projects the book onto a fixed depth window and reports how that window
//! changed, labelling each visible order as `NEW`, `UPDATE` or `DELETE`,
//! including orders pulled into or pushed out of the window without being
//! mentioned by the event.
//!
//! ## Quick Start
//!
//! ```rust
//! use depth_delta_reconstructor::{Action, MarketEvent, Session, Side, UpdateEntry};
//!
//! // Two visible levels per side
//! let mut session = Session::new("EUR/USD", 2).unwrap();
//!
//! let output = session.replay_events(vec![
//!     MarketEvent::subscribe(1, 0),
//!     MarketEvent::update(2, 125_000_000, vec![
//!         UpdateEntry::new_order(1, Side::Bid, 1.11821, 1_000_000),
//!         UpdateEntry::new_order(2, Side::Ask, 1.11823, 1_000_000),
//!     ]),
//!     MarketEvent::update(3, 250_000_000, vec![
//!         UpdateEntry::new_order(3, Side::Bid, 1.11821, 500_000),
//!         UpdateEntry::delete(1),
//!     ]),
//! ]);
//!
//! let records = output.into_result().unwrap();
//! assert_eq!(records.len(), 2);
//! assert!(records[0].is_book_refresh);
//!
//! // Same-price replacement is reported as a single update
//! assert_eq!(records[1].changes.len(), 1);
//! assert_eq!(records[1].changes[0].action, Action::Update);
//! assert_eq!(records[1].elapsed_ms(), 250);
//! ```
//!
//! ### Replay a FIX Log
//!
//! ```ignore
//! use depth_delta_reconstructor::{FixLogSource, Session, TimeWindow};
//!
//! let source = FixLogSource::new("logs/quotes.log", "EUR/USD")
//!     .with_window(TimeWindow::unbounded().with_start(start_ns))
//!     .skip_invalid(true);
//!
//! let mut session = Session::new("EUR/USD", 5)?;
//! let output = session.replay_source(source);
//!
//! for record in &output.records {
//!     println!("{}", serde_json::to_string(record)?);
//! }
//! if let Some(err) = output.error {
//!     eprintln!("replay stopped early: {err}");
//! }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`types`] | Core types: `Order`, `Side`, `Action`, `Change`, `InputChange` |
//! | [`event`] | Input events: `MarketEvent`, `UpdateEntry`, `SubscriptionType` |
//! | [`lob`] | Book, depth view, change classification and replay `Session` |
//! | [`record`] | Output record: `BookDelta` |
//! | [`source`] | Event sources: `EventSource`, `VecSource`, `TimeWindow` |
//! | [`fix`] | FIX 4.4 decoding: `FixDecoder`, `FixLogSource` |
//! | [`warnings`] | Warning tracking: `WarningTracker`, `Warning`, `WarningCategory` |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli` | ✅ | Build the `replay_fix_log` command-line tool |

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod error;
pub mod event;
pub mod fix;
pub mod lob;
pub mod record;
pub mod source;
pub mod types;
pub mod warnings;

// Re-exports - Core types
pub use error::{BookError, Result};
pub use types::{Action, Change, InputChange, Order, Side};

// Re-exports - Events
pub use event::{
    EntryKind, MarketEvent, OtherEvent, SubscribeEvent, SubscriptionType, UpdateEntry,
    UpdateEvent,
};

// Re-exports - LOB reconstruction
pub use lob::{
    book_changes, is_new, DepthView, OrderBook, RemovalKeying, ReplayOutput, Session,
    SessionConfig, SessionState, SessionStats,
};

// Re-exports - Output records
pub use record::BookDelta;

// Re-exports - Warnings
pub use warnings::{
    Warning, WarningCategory, WarningSummary, WarningTracker, WarningTrackerConfig,
};

// Re-exports - Source abstraction
pub use source::{EventSource, SourceMetadata, TimeWindow, VecSource};

// Re-exports - FIX decoding
pub use fix::{FixDecoder, FixDictionary, FixLogSource, FixLogStats};
