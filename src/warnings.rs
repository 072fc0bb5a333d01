//! Anomaly tracking for replay sessions.
//!
//! Nothing recorded here is fatal. Warnings mark places where the session
//! knowingly diverges from a naive reading of the input: unconditional book
//! resets, skipped out-of-band events, same-priced removals collapsing into
//! one diff input, ids switching sides.
//!
//! # Example
//!
//! ```
//! use depth_delta_reconstructor::warnings::{WarningCategory, WarningTracker};
//!
//! let mut tracker = WarningTracker::new();
//! tracker.record_event_warning(WarningCategory::SkippedEvent, "heartbeat", 4, 0);
//!
//! assert_eq!(tracker.count_by_category(WarningCategory::SkippedEvent), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Category of warning for classification and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningCategory {
    /// Book cleared by a subscribe/reset that is not snapshot-plus-updates
    BookReset,

    /// Event carried no book information and produced no record
    SkippedEvent,

    /// Two removals in one event shared a price; one was dropped from the diff input
    RemovalCollision,

    /// An added id was resting on the opposite side
    SideConflict,
}

impl WarningCategory {
    /// Get a human-readable name for the category.
    pub fn name(&self) -> &'static str {
        match self {
            WarningCategory::BookReset => "BOOK_RESET",
            WarningCategory::SkippedEvent => "SKIPPED_EVENT",
            WarningCategory::RemovalCollision => "REMOVAL_COLLISION",
            WarningCategory::SideConflict => "SIDE_CONFLICT",
        }
    }

    /// Get severity level (1=low, 2=medium, 3=high).
    pub fn severity(&self) -> u8 {
        match self {
            WarningCategory::BookReset => 1,
            WarningCategory::SkippedEvent => 1,
            WarningCategory::RemovalCollision => 3,
            WarningCategory::SideConflict => 2,
        }
    }
}

/// A single warning record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    /// Sequential id within the tracker
    pub id: u64,

    pub category: WarningCategory,

    pub message: String,

    /// Sequence number of the event that triggered it
    pub sequence: Option<u64>,

    /// Event timestamp (nanoseconds since epoch), not wall clock
    pub data_timestamp: Option<i64>,

    /// Related order id
    pub order_id: Option<u64>,

    /// Related price
    pub price: Option<f64>,
}

impl Warning {
    /// Create a new warning with minimal information.
    pub fn new(id: u64, category: WarningCategory, message: impl Into<String>) -> Self {
        Self {
            id,
            category,
            message: message.into(),
            sequence: None,
            data_timestamp: None,
            order_id: None,
            price: None,
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = Some(sequence);
        self
    }

    pub fn with_data_timestamp(mut self, ts: i64) -> Self {
        self.data_timestamp = Some(ts);
        self
    }

    pub fn with_order_id(mut self, order_id: u64) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }
}

/// Summary statistics for warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarningSummary {
    /// Total number of warnings (including ones beyond capacity)
    pub total: u64,

    /// Count by category name
    pub by_category: HashMap<String, u64>,

    /// Count by severity
    pub by_severity: HashMap<u8, u64>,

    /// First warning sequence number
    pub first_sequence: Option<u64>,

    /// Last warning sequence number
    pub last_sequence: Option<u64>,

    /// Number of distinct order ids involved
    pub unique_orders: u64,
}

/// Configuration for warning tracker.
#[derive(Debug, Clone)]
pub struct WarningTrackerConfig {
    /// Maximum number of warnings kept in memory (counts continue past it)
    pub max_warnings: usize,

    /// Mirror recorded warnings to the `log` facade
    pub log_warnings: bool,

    /// Minimum severity mirrored at `warn` level; lower ones go to `debug`
    pub min_warn_severity: u8,
}

impl Default for WarningTrackerConfig {
    fn default() -> Self {
        Self {
            max_warnings: 100_000,
            log_warnings: true,
            min_warn_severity: 2,
        }
    }
}

#[derive(Serialize)]
struct WarningExport<'a> {
    summary: WarningSummary,
    warnings: &'a [Warning],
}

/// Collects warnings raised during a replay.
#[derive(Debug, Clone)]
pub struct WarningTracker {
    config: WarningTrackerConfig,

    /// Stored warnings (bounded by `max_warnings`)
    warnings: Vec<Warning>,

    next_id: u64,

    category_counts: HashMap<WarningCategory, u64>,

    unique_orders: HashSet<u64>,
}

impl WarningTracker {
    /// Create a new warning tracker with default configuration.
    pub fn new() -> Self {
        Self::with_config(WarningTrackerConfig::default())
    }

    /// Create a new warning tracker with custom configuration.
    pub fn with_config(config: WarningTrackerConfig) -> Self {
        Self {
            config,
            warnings: Vec::new(),
            next_id: 1,
            category_counts: HashMap::new(),
            unique_orders: HashSet::new(),
        }
    }

    /// Record a prepared warning. Returns its id.
    pub fn record(&mut self, warning: Warning) -> u64 {
        if self.config.log_warnings {
            if warning.category.severity() >= self.config.min_warn_severity {
                log::warn!("[{}] {}", warning.category.name(), warning.message);
            } else {
                log::debug!("[{}] {}", warning.category.name(), warning.message);
            }
        }

        if let Some(order_id) = warning.order_id {
            self.unique_orders.insert(order_id);
        }
        *self.category_counts.entry(warning.category).or_insert(0) += 1;

        let id = warning.id;
        if self.warnings.len() < self.config.max_warnings {
            self.warnings.push(warning);
        }
        id
    }

    /// Record a warning tied to an event.
    pub fn record_event_warning(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
        sequence: u64,
        timestamp: i64,
    ) -> u64 {
        let warning = Warning::new(self.take_id(), category, message)
            .with_sequence(sequence)
            .with_data_timestamp(timestamp);
        self.record(warning)
    }

    /// Record a warning tied to an event and an order.
    pub fn record_order_warning(
        &mut self,
        category: WarningCategory,
        message: impl Into<String>,
        sequence: u64,
        order_id: u64,
        price: Option<f64>,
    ) -> u64 {
        let mut warning = Warning::new(self.take_id(), category, message)
            .with_sequence(sequence)
            .with_order_id(order_id);
        if let Some(p) = price {
            warning = warning.with_price(p);
        }
        self.record(warning)
    }

    /// Number of warnings stored.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Total count including warnings beyond capacity.
    pub fn total_count(&self) -> u64 {
        self.category_counts.values().sum()
    }

    pub fn count_by_category(&self, category: WarningCategory) -> u64 {
        self.category_counts.get(&category).copied().unwrap_or(0)
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn warnings_by_category(&self, category: WarningCategory) -> Vec<&Warning> {
        self.warnings
            .iter()
            .filter(|w| w.category == category)
            .collect()
    }

    /// Get summary statistics.
    pub fn summary(&self) -> WarningSummary {
        let mut by_category = HashMap::new();
        let mut by_severity = HashMap::new();

        for (cat, count) in &self.category_counts {
            by_category.insert(cat.name().to_string(), *count);
            *by_severity.entry(cat.severity()).or_insert(0) += *count;
        }

        WarningSummary {
            total: self.total_count(),
            by_category,
            by_severity,
            first_sequence: self.warnings.first().and_then(|w| w.sequence),
            last_sequence: self.warnings.last().and_then(|w| w.sequence),
            unique_orders: self.unique_orders.len() as u64,
        }
    }

    /// Export summary and warnings to a JSON file.
    pub fn export_to_file(&self, path: impl AsRef<Path>) -> crate::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let export = WarningExport {
            summary: self.summary(),
            warnings: &self.warnings,
        };
        serde_json::to_writer_pretty(&mut writer, &export)
            .map_err(|e| crate::BookError::generic(format!("warning export failed: {e}")))?;
        writer.flush()?;
        Ok(())
    }

    /// Clear all warnings.
    pub fn clear(&mut self) {
        self.warnings.clear();
        self.category_counts.clear();
        self.unique_orders.clear();
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl Default for WarningTracker {
    fn default() -> Self {
        Self::new()
    }
}
