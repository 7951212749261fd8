//! # prrscan-core
//!
//! A library for extracting Part Results records from STDF test-data
//! containers, bounded to the byte range an in-flight transfer has
//! already delivered.
//!
//! This crate provides the core functionality for:
//! - Walking a container file's variable-length record stream
//! - Enforcing a half-open byte window so partially delivered records
//!   are never decoded
//! - Classifying Part Results records across the type-code aliases real
//!   tester toolchains emit
//! - Serializing the extracted set into the downstream JSON document
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`scanner`]: Window validation, header gate, and the record-scan loop
//! - [`classify`]: Target-type classification and optional diagnostics
//! - [`report`]: Output document serialization
//! - [`sync`]: Transfer-progress message schema
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use prrscan_core::{report, Extractor};
//!
//! // Scan the byte range a transfer milestone announced as delivered.
//! let extractor = Extractor::new();
//! let extraction = extractor.extract("/data/lot42.stdf", 0, 2_048)?;
//!
//! // Render the result document against the announcement's timestamp.
//! let document = report::render(&extraction.records, 1_740_000_000)?;
//! println!("{document}");
//! # Ok::<(), prrscan_core::Error>(())
//! ```
//!
//! ## Concurrency
//!
//! One extraction call is strictly sequential, since each record's offset
//! derives from the previous record's declared length. Calls are
//! independent: every call opens, reads, and drops its own file handle,
//! takes no lock, and never reads past its window end, so the transfer
//! process can keep appending to the same file throughout.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod classify;
pub mod error;
pub mod report;
pub mod scanner;
pub mod sync;

// Re-export primary types for convenience
pub use classify::{TypeClassifier, TypeDiagnostics, PART_RESULTS_ALIASES, PART_RESULTS_TYPE};
pub use error::{Error, Result};
pub use report::{render, write_report, PartReport};
pub use scanner::{
    extract_file, extract_file_with_config, Extraction, ExtractionWindow, Extractor, PartResult,
    ScanStats, ScannerConfig, MAX_RECORD_LEN,
};
pub use sync::SyncMessage;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
