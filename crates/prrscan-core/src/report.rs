//! Report serialization for extracted part results.
//!
//! Maps the retained record set plus an externally supplied reference
//! timestamp into the JSON document consumed downstream. Zero records in
//! range is a success: the document is still written, as an empty array
//! behind an explanatory comment line, so consumers can tell "processed,
//! nothing found" from "never processed".

use crate::error::{Error, Result};
use crate::scanner::PartResult;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Placeholder for bytes outside printable ASCII
const PLACEHOLDER: char = '?';

/// Comment line written ahead of an empty document
const EMPTY_NOTE: &str = "// No part-results records found in the processed file range\n";

/// One element of the output document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartReport {
    /// Test-head position identifier
    pub head_number: u8,
    /// Test-site position identifier
    pub site_number: u8,
    /// Number of tests executed on this part
    pub test_count: u16,
    /// Hardware bin classification
    pub hard_bin: i32,
    /// Software bin classification
    pub soft_bin: i32,
    /// Elapsed test time in milliseconds
    pub test_time_ms: u32,
    /// Wafer X coordinate, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_coord: Option<i16>,
    /// Wafer Y coordinate, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_coord: Option<i16>,
    /// Part disposition flags
    pub part_flags: PartFlagsReport,
    /// Sanitized part identifier, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,
    /// Sanitized part description, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_text: Option<String>,
    /// Reference timestamp, seconds since epoch
    pub last_modified: i64,
    /// Start-of-test timestamp, seconds since epoch
    pub sot: i64,
    /// End-of-test timestamp, seconds since epoch
    pub eot: i64,
}

/// The flags group of one output element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartFlagsReport {
    /// Part was retested and this result is superseded
    pub superseded: bool,
    /// Test ended abnormally
    pub abnormal: bool,
    /// Part failed
    pub failed: bool,
    /// The pass/fail bit carries no information
    pub invalid_flag: bool,
}

impl PartReport {
    /// Derives one output element from a decoded record and the reference
    /// timestamp.
    ///
    /// Start-of-test backdates the reference timestamp by the whole
    /// seconds of elapsed test time; end-of-test and last-modified are the
    /// reference timestamp itself.
    pub fn from_record(record: &PartResult, sync_time: i64) -> Self {
        Self {
            head_number: record.head_number,
            site_number: record.site_number,
            test_count: record.test_count,
            hard_bin: record.hard_bin,
            soft_bin: record.soft_bin,
            test_time_ms: record.elapsed_ms,
            x_coord: record.x_coord,
            y_coord: record.y_coord,
            part_flags: PartFlagsReport {
                superseded: record.flags.superseded,
                abnormal: record.flags.abnormal,
                failed: record.flags.failed,
                invalid_flag: record.flags.invalid,
            },
            part_id: record.part_id.as_deref().map(sanitize),
            part_text: record.part_text.as_deref().map(sanitize),
            last_modified: sync_time,
            sot: sync_time - i64::from(record.elapsed_ms / 1000),
            eot: sync_time,
        }
    }
}

/// Sanitizes a string field for the output document.
///
/// Bytes outside printable ASCII become `?`; backslash, double quote, and
/// forward slash get a backslash escape.
pub fn sanitize(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        if (32..127).contains(&byte) {
            let c = byte as char;
            if matches!(c, '\\' | '"' | '/') {
                result.push('\\');
            }
            result.push(c);
        } else {
            result.push(PLACEHOLDER);
        }
    }
    result
}

/// Renders the full document: a JSON array, 4-space indented, one element
/// per retained record in stream order.
pub fn render(records: &[PartResult], sync_time: i64) -> Result<String> {
    let reports: Vec<PartReport> = records
        .iter()
        .map(|record| PartReport::from_record(record, sync_time))
        .collect();

    let mut out = Vec::new();
    if reports.is_empty() {
        out.extend_from_slice(EMPTY_NOTE.as_bytes());
    }

    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    reports
        .serialize(&mut serializer)
        .map_err(|e| Error::internal(format!("report serialization failed: {}", e)))?;

    String::from_utf8(out).map_err(|e| Error::internal(format!("report is not UTF-8: {}", e)))
}

/// Writes the document to `path`, creating parent directories as needed.
pub fn write_report(records: &[PartResult], path: impl AsRef<Path>, sync_time: i64) -> Result<()> {
    let path = path.as_ref();
    if records.is_empty() {
        warn!("no part-results records to save to {}", path.display());
    }

    let document = render(records, sync_time)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::report_write(parent, e))?;
        }
    }
    fs::write(path, document).map_err(|e| Error::report_write(path, e))?;

    info!(
        "saved {} part-results records to {}",
        records.len(),
        path.display()
    );
    Ok(())
}
