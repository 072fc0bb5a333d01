//! Limit Order Book (LOB) reconstruction and depth change detection.
//!
//! - [`OrderBook`]: full-depth, order-level book for one symbol
//! - [`DepthView`]: top-N projection of a book
//! - [`book_changes`]: classification of visible changes between two books
//! - [`Session`]: event-driven replay producing one record per update

mod book;
mod depth;
pub mod diff;
pub mod session;

pub use book::{OrderBook, OrderMap};
pub use depth::DepthView;
pub use diff::{book_changes, is_new};
pub use session::{RemovalKeying, ReplayOutput, Session, SessionConfig, SessionState, SessionStats};
