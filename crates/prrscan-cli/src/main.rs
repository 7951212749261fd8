//! prrscan - Extract Part Results records from STDF test-data files
//!
//! Runs one windowed extraction call end to end: normalize the byte
//! window, scan the container for Part Results records, and emit the
//! result document as JSON. The window can be given explicitly or taken
//! from a transfer-progress message as the companion sync process emits
//! them.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser};
use prrscan_core::sync::parse_sync_time;
use prrscan_core::{report, Extraction, Extractor, ScannerConfig, SyncMessage, TypeDiagnostics};
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// Extract Part Results records from STDF test-data files
#[derive(Parser, Debug)]
#[command(name = "prrscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the STDF file to scan
    #[arg(short, long)]
    file: PathBuf,

    #[command(flatten)]
    window: WindowArgs,

    /// Reference timestamp: epoch seconds or "YYYY/MM/DD HH:MM:SS" (default: now)
    #[arg(long)]
    sync_time: Option<String>,

    /// Output path for the JSON document (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Scan and summarize without writing the document
    #[arg(long)]
    dry_run: bool,

    /// Additional type codes to classify as Part Results (repeatable)
    #[arg(long = "target-type", value_name = "CODE")]
    target_types: Vec<u8>,

    /// Track type-code frequencies and report the most common unknown code
    #[arg(long)]
    diagnostics: bool,
}

#[derive(Args, Debug)]
struct WindowArgs {
    /// Start byte offset of the extraction window
    #[arg(long, default_value = "0", conflicts_with = "message")]
    start: i64,

    /// End byte offset, exclusive (-1 = through end of file)
    #[arg(long, default_value = "-1", conflicts_with = "message")]
    end: i64,

    /// Inline transfer-progress message JSON carrying window and timestamp
    #[arg(short, long)]
    message: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    if !cli.file.exists() {
        bail!("input file does not exist: {}", cli.file.display());
    }
    if !cli.file.is_file() {
        bail!("input path is not a file: {}", cli.file.display());
    }

    let (start, end, message_time) = resolve_window(&cli.window)?;
    let sync_time = match cli.sync_time.as_deref() {
        Some(text) => parse_sync_time(text),
        None => message_time.unwrap_or_else(|| chrono::Local::now().timestamp()),
    };
    debug!(
        "window {}..{} with reference timestamp {}",
        start, end, sync_time
    );

    let mut target_types = ScannerConfig::default().target_types;
    target_types.extend(&cli.target_types);
    let config = ScannerConfig::new().target_types(target_types);

    let extractor = Extractor::with_config(config);
    let mut diagnostics = cli.diagnostics.then(TypeDiagnostics::new);

    let extraction = extractor
        .extract_with_diagnostics(&cli.file, start, end, diagnostics.as_mut())
        .with_context(|| format!("failed to extract from {}", cli.file.display()))?;

    summarize(&extraction);

    if cli.dry_run {
        println!(
            "Would report {} part-results record(s) from {}",
            extraction.len(),
            cli.file.display()
        );
        return Ok(());
    }

    match cli.output {
        Some(ref path) => {
            report::write_report(&extraction.records, path, sync_time)
                .with_context(|| format!("failed to write report to {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => {
            let document = report::render(&extraction.records, sync_time)?;
            println!("{document}");
        }
    }

    Ok(())
}

/// Derives the extraction window, either from explicit bounds or from a
/// transfer-progress message.
fn resolve_window(window: &WindowArgs) -> Result<(i64, i64, Option<i64>)> {
    match window.message.as_deref() {
        Some(text) => {
            let message = SyncMessage::from_json(text).context("failed to parse sync message")?;
            info!(
                "sync message for '{}': window {}..{}",
                message.file_name, message.previous_position, message.read_position
            );
            let (start, end) = message.window();
            Ok((start, end, Some(message.sync_time)))
        }
        None => Ok((window.start, window.end, None)),
    }
}

fn summarize(extraction: &Extraction) {
    let stats = extraction.stats;
    info!(
        "scan summary: {} records seen, {} parts extracted, {} discarded, {} skipped, {} out of window",
        stats.records_seen,
        stats.parts_extracted,
        stats.parts_discarded,
        stats.records_skipped,
        stats.out_of_window
    );
    if let Some(abort) = &extraction.abort {
        warn!("scan stopped early: {} (partial results preserved)", abort);
    }
}
