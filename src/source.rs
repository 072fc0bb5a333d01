//! Event source abstraction for feeding a [`Session`](crate::Session).
//!
//! A source turns some input (a log file, an in-memory list, a live feed)
//! into an ordered stream of [`MarketEvent`]s. Decoding failures travel
//! through the stream as `Err` items so the session can stop at the exact
//! event that could not be read.
//!
//! # Implementing Custom Sources
//!
//! ```
//! use depth_delta_reconstructor::source::{EventSource, SourceMetadata};
//! use depth_delta_reconstructor::{MarketEvent, Result};
//!
//! struct Heartbeats {
//!     count: u64,
//!     metadata: SourceMetadata,
//! }
//!
//! impl EventSource for Heartbeats {
//!     type EventIter = std::vec::IntoIter<Result<MarketEvent>>;
//!
//!     fn events(self) -> Result<Self::EventIter> {
//!         let events: Vec<_> = (1..=self.count)
//!             .map(|seq| Ok(MarketEvent::other(seq, 0)))
//!             .collect();
//!         Ok(events.into_iter())
//!     }
//!
//!     fn metadata(&self) -> &SourceMetadata {
//!         &self.metadata
//!     }
//! }
//! ```

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::event::MarketEvent;

// ============================================================================
// Time Window
// ============================================================================

/// Inclusive time filter in nanoseconds since the epoch.
///
/// A missing bound is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeWindow {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl TimeWindow {
    /// A window accepting every timestamp.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A window with both bounds set.
    pub fn between(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn with_start(mut self, start: i64) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_end(mut self, end: i64) -> Self {
        self.end = Some(end);
        self
    }

    /// True if `timestamp` lies within both bounds (inclusive).
    #[inline]
    pub fn contains(&self, timestamp: i64) -> bool {
        self.start.map_or(true, |s| timestamp >= s) && self.end.map_or(true, |e| timestamp <= e)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

// ============================================================================
// Source Metadata
// ============================================================================

/// Information about an event source, used for logging and output naming.
#[derive(Debug, Clone, Default)]
pub struct SourceMetadata {
    /// Symbol the source is filtered to
    pub symbol: Option<String>,

    /// Original file path (if loaded from file)
    pub file_path: Option<PathBuf>,

    /// Provider / format name (e.g., "fix44", "memory")
    pub provider: Option<String>,

    /// Time filter applied by the source
    pub window: TimeWindow,

    /// Estimated event count (for progress tracking)
    pub estimated_events: Option<u64>,

    /// File size in bytes (if applicable)
    pub file_size: Option<u64>,
}

impl SourceMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_file_path(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_estimated_events(mut self, count: u64) -> Self {
        self.estimated_events = Some(count);
        self
    }

    /// Metadata for a file: path plus size when the file exists.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let mut metadata = Self::new().with_file_path(path);

        if let Ok(meta) = std::fs::metadata(path) {
            metadata.file_size = Some(meta.len());
        }

        metadata
    }
}

// ============================================================================
// Event Source Trait
// ============================================================================

/// Anything that can yield an ordered stream of market events.
///
/// - `events()` consumes `self`; sources are single-pass.
/// - Opening failures are returned from `events()`; per-event failures are
///   yielded as `Err` items.
pub trait EventSource {
    /// The iterator type for events.
    type EventIter: Iterator<Item = Result<MarketEvent>>;

    /// Consume the source and return an iterator over events.
    fn events(self) -> Result<Self::EventIter>;

    /// Metadata about the source.
    fn metadata(&self) -> &SourceMetadata;
}

// ============================================================================
// Vector Source
// ============================================================================

type OkFn = fn(MarketEvent) -> Result<MarketEvent>;

/// In-memory source, for tests and embedding.
///
/// # Example
///
/// ```
/// use depth_delta_reconstructor::source::{EventSource, SourceMetadata, VecSource};
/// use depth_delta_reconstructor::MarketEvent;
///
/// let source = VecSource::new(vec![MarketEvent::subscribe(1, 0), MarketEvent::other(2, 0)])
///     .with_metadata(SourceMetadata::new().with_symbol("EUR/USD"));
///
/// assert_eq!(source.metadata().symbol.as_deref(), Some("EUR/USD"));
/// assert_eq!(source.events().unwrap().count(), 2);
/// ```
pub struct VecSource {
    events: Vec<MarketEvent>,
    metadata: SourceMetadata,
}

impl VecSource {
    pub fn new(events: Vec<MarketEvent>) -> Self {
        Self {
            metadata: SourceMetadata::new()
                .with_provider("memory")
                .with_estimated_events(events.len() as u64),
            events,
        }
    }

    /// Set custom metadata.
    pub fn with_metadata(mut self, metadata: SourceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

impl EventSource for VecSource {
    type EventIter = std::iter::Map<std::vec::IntoIter<MarketEvent>, OkFn>;

    fn events(self) -> Result<Self::EventIter> {
        Ok(self.events.into_iter().map(Ok as OkFn))
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_window_bounds_are_inclusive() {
        let window = TimeWindow::between(10, 20);
        assert!(!window.contains(9));
        assert!(window.contains(10));
        assert!(window.contains(20));
        assert!(!window.contains(21));
    }

    #[test]
    fn test_time_window_open_bounds() {
        assert!(TimeWindow::unbounded().contains(i64::MIN));
        assert!(TimeWindow::unbounded().is_unbounded());

        let from = TimeWindow::unbounded().with_start(5);
        assert!(!from.contains(4));
        assert!(from.contains(i64::MAX));

        let until = TimeWindow::unbounded().with_end(5);
        assert!(until.contains(-1));
        assert!(!until.contains(6));
    }

    #[test]
    fn test_vec_source() {
        let events = vec![MarketEvent::subscribe(1, 0), MarketEvent::other(2, 5)];
        let source = VecSource::new(events.clone());

        assert_eq!(source.metadata().provider.as_deref(), Some("memory"));
        assert_eq!(source.metadata().estimated_events, Some(2));

        let collected: Vec<MarketEvent> = source.events().unwrap().map(|e| e.unwrap()).collect();
        assert_eq!(collected, events);
    }

    #[test]
    fn test_metadata_builder() {
        let metadata = SourceMetadata::new()
            .with_symbol("EUR/USD")
            .with_provider("fix44")
            .with_window(TimeWindow::between(1, 2));

        assert_eq!(metadata.symbol.as_deref(), Some("EUR/USD"));
        assert_eq!(metadata.window, TimeWindow::between(1, 2));
        assert!(metadata.file_path.is_none());
    }

    #[test]
    fn test_metadata_from_missing_path() {
        let metadata = SourceMetadata::from_path("/nonexistent/fix.log");
        assert!(metadata.file_path.is_some());
        assert!(metadata.file_size.is_none());
    }
}
