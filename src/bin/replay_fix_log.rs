//! Replay a FIX engine log and print the depth changes of one symbol.
//!
//! # Usage
//!
//! ```bash
//! # Top 5 levels of EUR/USD, JSON lines on stdout
//! cargo run --release --bin replay_fix_log -- \
//!     --input logs/quotes.log \
//!     --symbol EUR/USD \
//!     --depth 5
//!
//! # Restrict to a time window and keep the warnings
//! cargo run --release --bin replay_fix_log -- \
//!     --input logs/quotes.log \
//!     --symbol EUR/USD \
//!     --start 2015-03-03T22:10:00 \
//!     --end 2015-03-03T22:15:00 \
//!     --output eurusd.jsonl \
//!     --warnings eurusd_warnings.json
//! ```
//!
//! Times are read as UTC, like FIX SendingTime. Set `RUST_LOG=debug` for
//! per-event logging.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use chrono::NaiveDateTime;
use clap::Parser;

use depth_delta_reconstructor::{
    BookDelta, BookError, EventSource, FixLogSource, RemovalKeying, Result, Session,
    SessionConfig, TimeWindow,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "replay_fix_log")]
#[command(about = "Reconstruct a symbol's order book from a FIX log and report top-N depth changes")]
struct Args {
    /// FIX log file, one message per line
    #[arg(short, long)]
    input: PathBuf,

    /// Symbol to follow (lines not mentioning it are ignored)
    #[arg(short, long)]
    symbol: String,

    /// Visible levels per side
    #[arg(short, long, default_value_t = 5)]
    depth: usize,

    /// Ignore events before this time (YYYY-MM-DDTHH:MM:SS[.fff])
    #[arg(long, value_parser = parse_time)]
    start: Option<i64>,

    /// Ignore events after this time (YYYY-MM-DDTHH:MM:SS[.fff])
    #[arg(long, value_parser = parse_time)]
    end: Option<i64>,

    /// Output file for JSON lines (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Key removed orders by id instead of price
    #[arg(long)]
    strict_removals: bool,

    /// Skip lines that cannot be decoded instead of stopping
    #[arg(long)]
    skip_invalid: bool,

    /// Write collected warnings to this JSON file
    #[arg(long)]
    warnings: Option<PathBuf>,
}

fn parse_time(value: &str) -> std::result::Result<i64, String> {
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| format!("invalid time '{value}': {e}"))?;
    naive
        .and_utc()
        .timestamp_nanos_opt()
        .ok_or_else(|| format!("time out of range: {value}"))
}

fn write_records(records: &[BookDelta], output: Option<&PathBuf>) -> Result<()> {
    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);

    for record in records {
        serde_json::to_writer(&mut writer, record)
            .map_err(|e| BookError::generic(format!("Failed to serialize record: {e}")))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn run(args: Args) -> Result<bool> {
    let keying = if args.strict_removals {
        RemovalKeying::ById
    } else {
        RemovalKeying::ByPrice
    };
    let config = SessionConfig::new(args.symbol.clone(), args.depth).with_removal_keying(keying);
    let mut session = Session::with_config(config)?;

    let window = TimeWindow {
        start: args.start,
        end: args.end,
    };
    let source = FixLogSource::new(&args.input, args.symbol.clone())
        .with_window(window)
        .skip_invalid(args.skip_invalid);

    let started = Instant::now();
    let mut events = source.events()?;
    let output = session.replay(events.by_ref());
    let elapsed = started.elapsed();

    let read = events.stats();
    log::info!(
        "{}: {} lines read, {} matched, {} decoded, {} skipped, {} outside window",
        args.input.display(),
        read.lines_read,
        read.lines_matched,
        read.events_decoded,
        read.events_skipped,
        read.events_filtered
    );

    write_records(&output.records, args.output.as_ref())?;

    if let Some(path) = &args.warnings {
        session.warnings().export_to_file(path)?;
        log::info!("Wrote {} warnings to {}", session.warnings().len(), path.display());
    }

    let stats = session.stats();
    log::info!(
        "{}: {} events, {} records, {} changes in {:.2?}",
        args.symbol,
        stats.events_processed,
        stats.records_emitted,
        stats.changes_emitted,
        elapsed
    );
    if stats.removal_collisions > 0 {
        log::warn!(
            "{} removals were collapsed by price (use --strict-removals to keep them)",
            stats.removal_collisions
        );
    }

    match output.error {
        Some(err) => {
            log::error!("Replay stopped after {} records: {err}", output.records.len());
            Ok(false)
        }
        None => Ok(true),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Args::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
