//! Single-symbol replay session.
//!
//! A [`Session`] folds an ordered stream of [`MarketEvent`]s over one
//! [`OrderBook`] and emits one [`BookDelta`] per update event:
//! - subscribe/reset clears the book and starts a new reference window
//! - update applies all adds, then all deletes, and diffs the depth window
//! - anything else is skipped (no record)
//!
//! Any error is fatal for the rest of the stream. Records emitted before the
//! failing event stay valid.

use ahash::RandomState;
use indexmap::IndexMap;

use super::book::OrderBook;
use super::diff::book_changes;
use crate::error::{BookError, Result};
use crate::event::{MarketEvent, OtherEvent, SubscribeEvent, SubscriptionType, UpdateEvent};
use crate::record::BookDelta;
use crate::source::EventSource;
use crate::types::{InputChange, Order};
use crate::warnings::{WarningCategory, WarningTracker, WarningTrackerConfig};

/// How removed orders of one event are collected before diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalKeying {
    /// Keyed by price (default): a later removal at the same price replaces
    /// the earlier one, which then never reaches the diff.
    #[default]
    ByPrice,

    /// Keyed by order id: every removal reaches the diff.
    ById,
}

/// Configuration for a replay session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Symbol label (filtering happens upstream)
    pub symbol: String,

    /// Depth window per side (N >= 1)
    pub depth: usize,

    /// Collection of removed orders per event
    pub removal_keying: RemovalKeying,

    /// Mirror warnings to the log facade
    pub log_warnings: bool,
}

impl SessionConfig {
    /// Create a new config for a symbol and depth.
    pub fn new(symbol: impl Into<String>, depth: usize) -> Self {
        Self {
            symbol: symbol.into(),
            depth,
            removal_keying: RemovalKeying::default(),
            log_warnings: true,
        }
    }

    /// Set how removed orders are collected.
    pub fn with_removal_keying(mut self, keying: RemovalKeying) -> Self {
        self.removal_keying = keying;
        self
    }

    /// Enable/disable warning logs.
    pub fn with_logging(mut self, log: bool) -> Self {
        self.log_warnings = log;
        self
    }
}

/// Session lifecycle. There is no terminal state; the stream simply ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingSubscription,
    BookActive,
}

/// Statistics for monitoring a replay.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Total events seen (including the failing one)
    pub events_processed: u64,

    /// Subscribe/reset events
    pub subscriptions: u64,

    /// Update events fully applied
    pub updates: u64,

    /// Events skipped without a record
    pub skipped_events: u64,

    /// Records emitted
    pub records_emitted: u64,

    /// Change entries across all records
    pub changes_emitted: u64,

    /// Removals dropped by price keying
    pub removal_collisions: u64,

    /// Last timestamp seen (nanoseconds since epoch)
    pub last_timestamp: Option<i64>,
}

/// Result of a batch replay: the records produced, plus the error that
/// stopped the replay early, if any.
#[derive(Debug, Clone)]
pub struct ReplayOutput {
    pub records: Vec<BookDelta>,
    pub error: Option<BookError>,
}

impl ReplayOutput {
    /// True if every event was processed.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// All records on success, the first fatal error otherwise.
    pub fn into_result(self) -> Result<Vec<BookDelta>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.records),
        }
    }
}

/// Replay session for one symbol.
#[derive(Debug, Clone)]
pub struct Session {
    config: SessionConfig,

    /// The single live book
    book: OrderBook,

    state: SessionState,

    /// Subscribe/reset event that opened the current window
    reference: Option<SubscribeEvent>,

    /// Next record is the first after a subscribe/reset
    pending_refresh: bool,

    stats: SessionStats,

    warnings: WarningTracker,
}

impl Session {
    /// Create a session with default configuration.
    ///
    /// # Errors
    /// `InvalidDepth` if `depth` is zero.
    ///
    /// # Example
    /// ```
    /// use depth_delta_reconstructor::{MarketEvent, Session, Side, UpdateEntry};
    ///
    /// let mut session = Session::new("EUR/USD", 2).unwrap();
    /// session.process_event(&MarketEvent::subscribe(1, 0)).unwrap();
    ///
    /// let update = MarketEvent::update(2, 5_000_000, vec![
    ///     UpdateEntry::new_order(10, Side::Bid, 1.1182, 1_000_000),
    /// ]);
    /// let record = session.process_event(&update).unwrap().unwrap();
    ///
    /// assert!(record.is_book_refresh);
    /// assert_eq!(record.changes.len(), 1);
    /// assert_eq!(record.elapsed_ms(), 5);
    /// ```
    pub fn new(symbol: impl Into<String>, depth: usize) -> Result<Self> {
        Self::with_config(SessionConfig::new(symbol, depth))
    }

    /// Create a session with custom configuration.
    pub fn with_config(config: SessionConfig) -> Result<Self> {
        if config.depth == 0 {
            return Err(BookError::InvalidDepth(config.depth));
        }

        let warnings = WarningTracker::with_config(WarningTrackerConfig {
            log_warnings: config.log_warnings,
            ..Default::default()
        });

        Ok(Self {
            book: OrderBook::new(config.symbol.clone()),
            config,
            state: SessionState::AwaitingSubscription,
            reference: None,
            pending_refresh: false,
            stats: SessionStats::default(),
            warnings,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn depth(&self) -> usize {
        self.config.depth
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The live full-depth book.
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn warnings(&self) -> &WarningTracker {
        &self.warnings
    }

    /// Process one event.
    ///
    /// Returns `Some(record)` for update events and `None` for events that
    /// produce no record.
    ///
    /// # Errors
    /// `NoActiveSubscription`, `OrderNotFound`, `InvalidSide` or
    /// `MalformedEvent`. The event is abandoned where it failed.
    pub fn process_event(&mut self, event: &MarketEvent) -> Result<Option<BookDelta>> {
        self.stats.events_processed += 1;
        self.stats.last_timestamp = Some(event.timestamp());

        match event {
            MarketEvent::Subscribe(subscribe) => {
                self.subscribe(subscribe);
                Ok(None)
            }
            MarketEvent::Update(update) => self.apply_update(update).map(Some),
            MarketEvent::Other(other) => {
                self.skip(other);
                Ok(None)
            }
        }
    }

    /// Fold a stream of (possibly failed) events.
    ///
    /// Stops at the first error and returns the records produced so far.
    pub fn replay<I>(&mut self, events: I) -> ReplayOutput
    where
        I: IntoIterator<Item = Result<MarketEvent>>,
    {
        let mut records = Vec::new();

        for event in events {
            match event.and_then(|e| self.process_event(&e)) {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(err) => {
                    log::error!(
                        "Replay of {} aborted after {} records: {err}",
                        self.config.symbol,
                        records.len()
                    );
                    return ReplayOutput {
                        records,
                        error: Some(err),
                    };
                }
            }
        }

        log::info!(
            "Replayed {} events for {}: {} records, {} changes, {} warnings",
            self.stats.events_processed,
            self.config.symbol,
            self.stats.records_emitted,
            self.stats.changes_emitted,
            self.warnings.total_count()
        );

        ReplayOutput {
            records,
            error: None,
        }
    }

    /// Fold a stream of well-formed events.
    pub fn replay_events<I>(&mut self, events: I) -> ReplayOutput
    where
        I: IntoIterator<Item = MarketEvent>,
    {
        self.replay(events.into_iter().map(Ok))
    }

    /// Fold every event of a source.
    pub fn replay_source<S: EventSource>(&mut self, source: S) -> ReplayOutput {
        match source.events() {
            Ok(events) => self.replay(events),
            Err(err) => ReplayOutput {
                records: Vec::new(),
                error: Some(err),
            },
        }
    }

    /// Every subscribe/reset clears the book, whatever its subscription type.
    fn subscribe(&mut self, event: &SubscribeEvent) {
        log::debug!(
            "Subscribe #{} ({:?}): resetting {} book ({} orders)",
            event.sequence_number,
            event.subscription_type,
            self.config.symbol,
            self.book.len()
        );

        if event.subscription_type != SubscriptionType::SnapshotPlusUpdates {
            self.warnings.record_event_warning(
                WarningCategory::BookReset,
                format!(
                    "book reset by {:?} request #{}",
                    event.subscription_type, event.sequence_number
                ),
                event.sequence_number,
                event.timestamp,
            );
        }

        self.reference = Some(*event);
        self.pending_refresh = true;
        self.book.reset();
        self.state = SessionState::BookActive;
        self.stats.subscriptions += 1;
    }

    fn skip(&mut self, event: &OtherEvent) {
        self.stats.skipped_events += 1;
        self.warnings.record_event_warning(
            WarningCategory::SkippedEvent,
            format!("event #{} carries no book data, no record emitted", event.sequence_number),
            event.sequence_number,
            event.timestamp,
        );
    }

    fn apply_update(&mut self, event: &UpdateEvent) -> Result<BookDelta> {
        let reference = self.reference.ok_or(BookError::NoActiveSubscription {
            sequence: event.sequence_number,
        })?;
        let depth = self.config.depth;
        let seq = event.sequence_number;

        let prev_book = self.book.clone();
        let mut input_changes = Vec::with_capacity(event.entries.len());

        let mut added: Vec<Order> = Vec::new();
        for entry in event.additions() {
            let order = entry.to_order()?;
            if let Some(resting) = self.book.get(order.id) {
                if resting.side != order.side {
                    self.warnings.record_order_warning(
                        WarningCategory::SideConflict,
                        format!("order {} re-added on {:?}", order.id, order.side),
                        seq,
                        order.id,
                        Some(order.price),
                    );
                }
            }
            self.book.add(order)?;
            input_changes.push(InputChange::New(order));
            added.push(order);
        }

        // Insertion-ordered; re-inserting a key keeps its original position
        let mut removed: IndexMap<u64, Order, RandomState> = IndexMap::default();
        for entry in event.deletions() {
            let order = self.book.delete(entry.order_id)?;
            input_changes.push(InputChange::Delete { order_id: order.id });

            let key = match self.config.removal_keying {
                RemovalKeying::ByPrice => order.price.to_bits(),
                RemovalKeying::ById => order.id,
            };
            if let Some(dropped) = removed.insert(key, order) {
                self.stats.removal_collisions += 1;
                self.warnings.record_order_warning(
                    WarningCategory::RemovalCollision,
                    format!(
                        "removal of order {} at {} replaced by order {} in update #{seq}",
                        dropped.id, dropped.price, order.id
                    ),
                    seq,
                    dropped.id,
                    Some(dropped.price),
                );
            }
        }
        let removed: Vec<Order> = removed.into_values().collect();

        let prev_view = prev_book.depth_view(depth);
        let view = self.book.depth_view(depth);
        let changes = if prev_view == view {
            Vec::new()
        } else {
            book_changes(&removed, &added, &prev_book, &self.book, depth)
        };

        let record = BookDelta {
            sequence_number: seq,
            input_changes,
            view,
            changes,
            start_time: reference.timestamp,
            end_time: event.timestamp,
            is_book_refresh: self.pending_refresh,
        };
        self.pending_refresh = false;

        self.stats.updates += 1;
        self.stats.records_emitted += 1;
        self.stats.changes_emitted += record.changes.len() as u64;

        Ok(record)
    }
}
