//! FIX 4.4 market data decoding.
//!
//! Turns tag=value market data messages into [`MarketEvent`]s:
//! - `35=V` (MarketDataRequest) becomes a subscribe/reset event
//! - `35=X` (MarketDataIncrementalRefresh) becomes an update event
//! - any other message type passes through as an out-of-band event
//!
//! [`FixLogSource`] reads the text logs written by a FIX engine, one message
//! per line, and feeds them through a [`FixDecoder`].
//!
//! # Example
//!
//! ```
//! use depth_delta_reconstructor::fix::{FixDecoder, FixDictionary};
//! use depth_delta_reconstructor::MarketEvent;
//!
//! let decoder = FixDecoder::new(FixDictionary::fix44());
//! let event = decoder
//!     .decode("8=FIX.4.4|35=X|34=7|52=20150303-22:10:02.873|268=1|279=2|278=42|")
//!     .unwrap();
//!
//! match event {
//!     MarketEvent::Update(update) => assert_eq!(update.deletions().count(), 1),
//!     _ => unreachable!(),
//! }
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::{BookError, Result};
use crate::event::{EntryKind, MarketEvent, SubscribeEvent, SubscriptionType, UpdateEntry};
use crate::source::{EventSource, SourceMetadata, TimeWindow};
use crate::types::Side;

/// Read buffer for log files.
pub const IO_BUFFER_SIZE: usize = 256 * 1024;

/// Standard FIX field delimiter.
pub const SOH: char = '\x01';

const SENDING_TIME_FORMAT: &str = "%Y%m%d-%H:%M:%S%.f";

// ============================================================================
// Dictionary
// ============================================================================

/// Tags the decoder needs to understand.
///
/// Built once and handed to the decoder; never global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixDictionary {
    pub msg_type: u32,
    pub msg_seq_num: u32,
    pub sending_time: u32,
    pub subscription_request_type: u32,
    pub no_md_entries: u32,
    pub md_update_action: u32,
    pub md_entry_type: u32,
    pub md_entry_id: u32,
    pub md_entry_px: u32,
    pub md_entry_size: u32,

    /// MsgType of a market data request
    pub request_msg_type: String,

    /// MsgType of an incremental refresh
    pub refresh_msg_type: String,
}

impl FixDictionary {
    /// FIX 4.4 tag numbers.
    pub fn fix44() -> Self {
        Self {
            msg_type: 35,
            msg_seq_num: 34,
            sending_time: 52,
            subscription_request_type: 263,
            no_md_entries: 268,
            md_update_action: 279,
            md_entry_type: 269,
            md_entry_id: 278,
            md_entry_px: 270,
            md_entry_size: 271,
            request_msg_type: "V".to_string(),
            refresh_msg_type: "X".to_string(),
        }
    }
}

impl Default for FixDictionary {
    fn default() -> Self {
        Self::fix44()
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// MDUpdateAction values.
const ACTION_NEW: i64 = 0;
const ACTION_CHANGE: i64 = 1;
const ACTION_DELETE: i64 = 2;

/// One repeating-group entry under construction.
#[derive(Debug, Default)]
struct GroupEntry {
    action: i64,
    order_id: Option<u64>,
    side: Option<Side>,
    price: Option<f64>,
    size: Option<u64>,
}

/// Decoder for single FIX messages.
#[derive(Debug, Clone, Default)]
pub struct FixDecoder {
    dictionary: FixDictionary,
}

impl FixDecoder {
    pub fn new(dictionary: FixDictionary) -> Self {
        Self { dictionary }
    }

    pub fn dictionary(&self) -> &FixDictionary {
        &self.dictionary
    }

    /// Decode one message. Fields may be separated by SOH or `|`.
    ///
    /// # Errors
    /// `MalformedEvent` for unparsable fields or missing header fields,
    /// `InvalidSide` for an unknown MDEntryType.
    pub fn decode(&self, message: &str) -> Result<MarketEvent> {
        let fields = split_fields(message)?;
        let dict = &self.dictionary;

        let msg_type = required(&fields, dict.msg_type, "MsgType")?;
        let sequence_number: u64 =
            parse(required(&fields, dict.msg_seq_num, "MsgSeqNum")?, "MsgSeqNum")?;
        let timestamp =
            parse_sending_time(required(&fields, dict.sending_time, "SendingTime")?)?;

        if msg_type.eq_ignore_ascii_case(&dict.request_msg_type) {
            let code: i64 = parse(
                required(&fields, dict.subscription_request_type, "SubscriptionRequestType")?,
                "SubscriptionRequestType",
            )?;
            Ok(MarketEvent::Subscribe(SubscribeEvent {
                sequence_number,
                timestamp,
                subscription_type: SubscriptionType::from_code(code),
            }))
        } else if msg_type.eq_ignore_ascii_case(&dict.refresh_msg_type) {
            let entries = self.decode_entries(&fields, sequence_number)?;
            Ok(MarketEvent::update(sequence_number, timestamp, entries))
        } else {
            Ok(MarketEvent::other(sequence_number, timestamp))
        }
    }

    /// Collect the MDEntries group. Each entry starts at MDUpdateAction.
    fn decode_entries(&self, fields: &[(u32, &str)], sequence: u64) -> Result<Vec<UpdateEntry>> {
        let dict = &self.dictionary;
        let mut groups: Vec<GroupEntry> = Vec::new();

        for &(tag, value) in fields {
            if tag == dict.md_update_action {
                groups.push(GroupEntry {
                    action: parse(value, "MDUpdateAction")?,
                    ..Default::default()
                });
                continue;
            }

            // Fields before the first entry belong to the header
            let Some(entry) = groups.last_mut() else {
                continue;
            };

            if tag == dict.md_entry_id {
                entry.order_id = Some(parse(value, "MDEntryID")?);
            } else if tag == dict.md_entry_type {
                entry.side = Some(Side::from_code(parse(value, "MDEntryType")?)?);
            } else if tag == dict.md_entry_px {
                entry.price = Some(parse(value, "MDEntryPx")?);
            } else if tag == dict.md_entry_size {
                entry.size = Some(parse_size(value)?);
            }
        }

        if let Some(declared) = fields.iter().find(|(t, _)| *t == dict.no_md_entries) {
            if declared.1.parse::<usize>().ok() != Some(groups.len()) {
                log::warn!(
                    "Update #{sequence} declares {} entries but carries {}",
                    declared.1,
                    groups.len()
                );
            }
        }

        let mut entries = Vec::with_capacity(groups.len());
        for group in groups {
            let order_id = group.order_id.ok_or_else(|| {
                BookError::malformed(format!("update #{sequence} has an entry without MDEntryID"))
            })?;

            match group.action {
                ACTION_NEW => entries.push(UpdateEntry {
                    kind: EntryKind::New,
                    order_id,
                    side: group.side,
                    price: group.price,
                    size: group.size,
                }),
                ACTION_DELETE => entries.push(UpdateEntry::delete(order_id)),
                ACTION_CHANGE => {
                    log::warn!("Update #{sequence}: skipping change entry for order {order_id}");
                }
                other => {
                    return Err(BookError::malformed(format!(
                        "update #{sequence}: unknown MDUpdateAction {other}"
                    )));
                }
            }
        }

        Ok(entries)
    }
}

fn split_fields(message: &str) -> Result<Vec<(u32, &str)>> {
    message
        .split(|c: char| c == SOH || c == '|')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(|field| {
            let (tag, value) = field
                .split_once('=')
                .ok_or_else(|| BookError::malformed(format!("field without '=': {field}")))?;
            let tag = tag
                .parse::<u32>()
                .map_err(|_| BookError::malformed(format!("invalid tag: {tag}")))?;
            Ok((tag, value))
        })
        .collect()
}

fn required<'a>(fields: &[(u32, &'a str)], tag: u32, name: &str) -> Result<&'a str> {
    fields
        .iter()
        .find(|(t, _)| *t == tag)
        .map(|(_, v)| *v)
        .ok_or_else(|| BookError::malformed(format!("missing {name} ({tag})")))
}

fn parse<T: std::str::FromStr>(value: &str, name: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| BookError::malformed(format!("invalid {name}: {value}")))
}

/// Sizes are whole units but some engines print them as decimals ("1000000.0").
fn parse_size(value: &str) -> Result<u64> {
    if let Ok(size) = value.parse::<u64>() {
        return Ok(size);
    }
    let size: f64 = parse(value, "MDEntrySize")?;
    if size < 0.0 || size.fract() != 0.0 {
        return Err(BookError::malformed(format!("invalid MDEntrySize: {value}")));
    }
    Ok(size as u64)
}

/// Parse a UTCTimestamp (`YYYYMMDD-HH:MM:SS[.sss]`) into nanoseconds.
pub fn parse_sending_time(value: &str) -> Result<i64> {
    let naive = NaiveDateTime::parse_from_str(value, SENDING_TIME_FORMAT)
        .map_err(|e| BookError::malformed(format!("invalid SendingTime {value}: {e}")))?;
    naive
        .and_utc()
        .timestamp_nanos_opt()
        .ok_or_else(|| BookError::malformed(format!("SendingTime out of range: {value}")))
}

/// Cut the FIX message out of a log line: the text between the first
/// `" : "` and the last space.
pub fn extract_message(line: &str) -> Option<&str> {
    let start = line.find(" : ")? + 3;
    let rest = &line[start..];
    let message = match rest.rfind(' ') {
        Some(end) => &rest[..end],
        None => rest,
    };
    let message = message.trim();
    (!message.is_empty()).then_some(message)
}

// ============================================================================
// Log File Source
// ============================================================================

/// Statistics for a log file read.
#[derive(Debug, Clone, Default)]
pub struct FixLogStats {
    /// Lines read from the file
    pub lines_read: u64,

    /// Lines mentioning the symbol
    pub lines_matched: u64,

    /// Events decoded and passed on
    pub events_decoded: u64,

    /// Lines skipped because they could not be decoded
    pub events_skipped: u64,

    /// Events dropped by the time window
    pub events_filtered: u64,
}

/// Event source over a FIX engine log.
///
/// Only lines containing the symbol are decoded. Events outside the time
/// window are dropped.
///
/// `Session::replay_source` consumes the iterator along with its
/// [`FixLogStats`]. Drive `events()` through `by_ref()` to read them after
/// the replay.
///
/// # Example
///
/// ```ignore
/// use depth_delta_reconstructor::fix::FixLogSource;
/// use depth_delta_reconstructor::{EventSource, Session};
///
/// let source = FixLogSource::new("logs/fix.log", "EUR/USD").skip_invalid(true);
/// let mut session = Session::new("EUR/USD", 2)?;
/// let mut events = source.events()?;
/// let records = session.replay(events.by_ref()).into_result()?;
/// println!("skipped {} lines", events.stats().events_skipped);
/// ```
#[derive(Debug, Clone)]
pub struct FixLogSource {
    path: PathBuf,
    symbol: String,
    decoder: FixDecoder,
    window: TimeWindow,
    skip_invalid: bool,
    metadata: SourceMetadata,
}

impl FixLogSource {
    /// Create a source decoding FIX 4.4.
    pub fn new(path: impl AsRef<Path>, symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Self {
            metadata: SourceMetadata::from_path(path.as_ref())
                .with_symbol(symbol.clone())
                .with_provider("fix44"),
            path: path.as_ref().to_path_buf(),
            symbol,
            decoder: FixDecoder::new(FixDictionary::fix44()),
            window: TimeWindow::default(),
            skip_invalid: false,
        }
    }

    /// Use a decoder with a different dictionary.
    pub fn with_decoder(mut self, decoder: FixDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Keep only events within `window`.
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self.metadata.window = window;
        self
    }

    /// Skip undecodable lines instead of failing.
    pub fn skip_invalid(mut self, skip: bool) -> Self {
        self.skip_invalid = skip;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EventSource for FixLogSource {
    type EventIter = FixEventIter;

    fn events(self) -> Result<Self::EventIter> {
        let file = File::open(&self.path).map_err(|e| {
            BookError::generic(format!("Failed to open {}: {e}", self.path.display()))
        })?;
        log::info!(
            "Reading {} events from {}",
            self.symbol,
            self.path.display()
        );

        Ok(FixEventIter {
            reader: BufReader::with_capacity(IO_BUFFER_SIZE, file),
            buf: Vec::with_capacity(1024),
            symbol: self.symbol,
            decoder: self.decoder,
            window: self.window,
            skip_invalid: self.skip_invalid,
            stats: FixLogStats::default(),
            done: false,
        })
    }

    fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }
}

/// Iterator over the events of a FIX log.
///
/// Lines are read as raw bytes and decoded lossily, so a stray non-UTF-8 byte
/// in one line does not end the stream.
pub struct FixEventIter {
    reader: BufReader<File>,
    buf: Vec<u8>,
    symbol: String,
    decoder: FixDecoder,
    window: TimeWindow,
    skip_invalid: bool,
    stats: FixLogStats,
    done: bool,
}

impl FixEventIter {
    pub fn stats(&self) -> &FixLogStats {
        &self.stats
    }

    fn decode_line(&self, line: &str) -> Result<MarketEvent> {
        let message = extract_message(line)
            .ok_or_else(|| BookError::malformed("no FIX message in log line"))?;
        self.decoder.decode(message)
    }
}

impl Iterator for FixEventIter {
    type Item = Result<MarketEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
            self.stats.lines_read += 1;

            let line = String::from_utf8_lossy(&self.buf);
            let line = line.trim_end_matches(&['\n', '\r'][..]);

            if !line.contains(&self.symbol) {
                continue;
            }
            self.stats.lines_matched += 1;

            let event = match self.decode_line(line) {
                Ok(event) => event,
                Err(e) if self.skip_invalid => {
                    log::warn!("Skipping line {}: {e}", self.stats.lines_read);
                    self.stats.events_skipped += 1;
                    continue;
                }
                Err(e) => {
                    log::error!("Undecodable line {}: {e}", self.stats.lines_read);
                    self.done = true;
                    return Some(Err(e));
                }
            };

            if !self.window.contains(event.timestamp()) {
                self.stats.events_filtered += 1;
                continue;
            }

            self.stats.events_decoded += 1;
            return Some(Ok(event));
        }
    }
}
