//! Windowed record scanning over STDF container files.
//!
//! This module walks a container file record by record and extracts Part
//! Results payloads, bounded by a half-open byte window so that only
//! records fully delivered by an in-flight transfer are ever decoded.
//!
//! ## Algorithm Overview
//!
//! 1. Normalize the requested byte range against the actual file size
//! 2. When the window starts at offset 0, validate the mandatory
//!    file-attributes record (platform/version gate)
//! 3. Walk the stream: read each 4-byte header, bounds-check the record
//!    against the window, classify its type, then decode-and-retain or
//!    skip by the declared length
//! 4. Stop at the window end, at end of stream, or on an unrecoverable
//!    cursor failure; already-decoded records survive every stop
//!
//! Record sizes vary and cannot be assumed fixed: the cursor advances by
//! each record's own declared length, which is why a record whose declared
//! length fails the sanity ceiling aborts the scan outright: nothing
//! after it can be trusted.

mod record;

use crate::classify::{TypeClassifier, TypeDiagnostics};
use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, error, trace, warn};

pub use record::{
    FileAttributes, PartFlags, PartResult, RecordHeader, FILE_HEADER_TYPE, HEADER_SIZE,
};

/// Sanity ceiling on a record's declared payload length; no valid record
/// in this container format comes anywhere near 100 KB
pub const MAX_RECORD_LEN: u64 = 100_000;

/// Consecutive invalid cursor positions tolerated before the scan aborts
const MAX_INVALID_POSITIONS: u32 = 5;

/// Immutable half-open byte range `[start, end)` bounding one extraction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionWindow {
    /// First byte offset inside the window
    pub start: u64,
    /// First byte offset past the window
    pub end: u64,
}

impl ExtractionWindow {
    /// Normalizes caller-supplied bounds against the actual file size.
    ///
    /// A negative start clamps to 0; a negative or oversized end clamps to
    /// the file size. Returns `None` when the normalized range is empty:
    /// a valid "nothing to do" outcome, not an error.
    pub fn normalize(req_start: i64, req_end: i64, file_size: u64) -> Option<Self> {
        let start = if req_start < 0 {
            warn!("negative start position {} requested, using 0", req_start);
            0
        } else {
            req_start as u64
        };

        let end = if req_end < 0 || req_end as u64 > file_size {
            debug!("using file end as end position: {}", file_size);
            file_size
        } else {
            req_end as u64
        };

        if start >= end {
            debug!("empty range: start {} >= end {}", start, end);
            return None;
        }

        Some(Self { start, end })
    }

    /// Window size in bytes.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the window covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a record starting at `offset` with `length` payload bytes
    /// lies fully inside the window. Overflow-safe: an implausible length
    /// or an offset near the integer ceiling fails the check rather than
    /// wrapping.
    pub fn contains_record(&self, offset: u64, length: u64) -> bool {
        if length > MAX_RECORD_LEN {
            return false;
        }
        let Some(body) = HEADER_SIZE.checked_add(length) else {
            return false;
        };
        let Some(record_end) = offset.checked_add(body) else {
            return false;
        };
        offset >= self.start && record_end <= self.end
    }
}

/// Configuration for the extractor
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Sanity ceiling on a record's declared payload length
    pub max_record_len: u64,
    /// Consecutive invalid cursor positions tolerated before aborting
    pub max_invalid_positions: u32,
    /// Type codes classified as Part Results
    pub target_types: Vec<u8>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_record_len: MAX_RECORD_LEN,
            max_invalid_positions: MAX_INVALID_POSITIONS,
            target_types: TypeClassifier::new().targets().to_vec(),
        }
    }
}

impl ScannerConfig {
    /// Creates a new scanner config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the record length sanity ceiling
    pub fn max_record_len(mut self, max: u64) -> Self {
        self.max_record_len = max;
        self
    }

    /// Sets the invalid cursor position tolerance
    pub fn max_invalid_positions(mut self, max: u32) -> Self {
        self.max_invalid_positions = max;
        self
    }

    /// Sets the type codes classified as Part Results
    pub fn target_types(mut self, targets: impl Into<Vec<u8>>) -> Self {
        self.target_types = targets.into();
        self
    }
}

/// Counters describing one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Records whose headers were read
    pub records_seen: u64,
    /// Part Results records decoded and retained
    pub parts_extracted: u64,
    /// Part Results records discarded by the validity guard or a decode failure
    pub parts_discarded: u64,
    /// Records of other kinds skipped by declared length
    pub records_skipped: u64,
    /// Records rejected by the window bounds check
    pub out_of_window: u64,
}

/// The outcome of one extraction call.
///
/// Exclusively owns every decoded record from the scan until dropped;
/// the whole set is released as a single unit with the value.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Decoded Part Results records, in stream order
    pub records: Vec<PartResult>,
    /// The normalized window the scan ran under, when one existed
    pub window: Option<ExtractionWindow>,
    /// Scan counters
    pub stats: ScanStats,
    /// Why the scan stopped early, if it did; records decoded before the
    /// stop point are valid partial results
    pub abort: Option<Error>,
}

impl Extraction {
    fn empty() -> Self {
        Self::default()
    }

    /// Whether the scan ran to the window end without aborting.
    pub fn is_complete(&self) -> bool {
        self.abort.is_none()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records were retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Extracts Part Results records from a container file within a byte window.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ScannerConfig,
}

impl Extractor {
    /// Creates a new extractor with default configuration
    pub fn new() -> Self {
        Self {
            config: ScannerConfig::default(),
        }
    }

    /// Creates a new extractor with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Extracts Part Results records from `path` within `[start, end)`.
    ///
    /// `end = -1` (or any negative or oversized value) means "through the
    /// actual end of file". The file handle lives only for this call and
    /// no lock is taken, so a transfer process may keep appending to the
    /// file concurrently; bytes past `end` are never read.
    pub fn extract(&self, path: impl AsRef<Path>, start: i64, end: i64) -> Result<Extraction> {
        self.extract_with_diagnostics(path, start, end, None)
    }

    /// Like [`extract`](Self::extract), with an injected diagnostics table
    /// that records the unrecognized type codes the scan encounters.
    pub fn extract_with_diagnostics(
        &self,
        path: impl AsRef<Path>,
        start: i64,
        end: i64,
        diagnostics: Option<&mut TypeDiagnostics>,
    ) -> Result<Extraction> {
        let path = path.as_ref();
        debug!("starting part-results extraction from {}", path.display());

        let file = File::open(path).map_err(|e| Error::file_open(path, e))?;
        let file_size = file
            .metadata()
            .map_err(|e| Error::file_probe(path, e))?
            .len();
        trace!("file size: {} bytes", file_size);

        let Some(window) = ExtractionWindow::normalize(start, end, file_size) else {
            return Ok(Extraction::empty());
        };
        debug!(
            "extraction range: {}..{} ({} bytes)",
            window.start,
            window.end,
            window.len()
        );

        let mut reader = BufReader::new(file);

        if window.start == 0 {
            self.check_file_header(&mut reader)?;
        } else {
            debug!(
                "starting at offset {}, skipping file-header validation",
                window.start
            );
        }

        reader
            .seek(SeekFrom::Start(window.start))
            .map_err(|e| Error::stream(window.start, e))?;

        Ok(self.run(reader, window, diagnostics))
    }

    /// Validates the mandatory first record when scanning from offset 0.
    ///
    /// The system ingests data from exactly one platform/version pair;
    /// anything else is a structural error that aborts before any record
    /// is decoded.
    fn check_file_header<R: Read>(&self, reader: &mut R) -> Result<()> {
        debug!("window starts at file beginning, verifying file-attributes record");

        let header = RecordHeader::read_from(reader).map_err(|e| Error::stream(0, e))?;
        if header.typ != FILE_HEADER_TYPE {
            error!(
                "file does not start with a file-attributes record, found type {}",
                header.typ
            );
            return Err(Error::MissingFileHeader { found: header.typ });
        }

        let mut payload = vec![0u8; usize::from(header.length)];
        reader
            .read_exact(&mut payload)
            .map_err(|e| Error::stream(HEADER_SIZE, e))?;
        let attrs = FileAttributes::decode(&payload)?;
        trace!(
            "file attributes: cpu_type={}, version={}",
            attrs.cpu_type,
            attrs.format_version
        );

        if attrs.cpu_type != FileAttributes::SUPPORTED_CPU_TYPE {
            return Err(Error::UnsupportedPlatform(attrs.cpu_type));
        }
        if attrs.format_version != FileAttributes::SUPPORTED_VERSION {
            return Err(Error::UnsupportedVersion(attrs.format_version));
        }

        Ok(())
    }

    /// The sequential scan loop. Strictly single-pass: record `k+1`'s
    /// offset is derived from record `k`'s declared length.
    fn run<R: Read + Seek>(
        &self,
        mut reader: R,
        window: ExtractionWindow,
        mut diagnostics: Option<&mut TypeDiagnostics>,
    ) -> Extraction {
        let classifier = TypeClassifier::with_targets(self.config.target_types.clone());
        let mut window = window;
        let mut records = Vec::new();
        let mut stats = ScanStats::default();
        let mut invalid_positions: u32 = 0;
        let mut abort = None;

        loop {
            let offset = match reader.stream_position() {
                Ok(p) => p,
                Err(e) => {
                    invalid_positions += 1;
                    warn!(
                        "invalid cursor position ({}), failure {} of {}",
                        e, invalid_positions, self.config.max_invalid_positions
                    );
                    if invalid_positions >= self.config.max_invalid_positions {
                        error!("too many consecutive invalid positions, aborting scan");
                        abort = Some(Error::CursorLost {
                            attempts: invalid_positions,
                        });
                    } else if let Ok(eof) = reader.seek(SeekFrom::End(0)) {
                        // The transfer may still be appending; trust the
                        // real end of file over the requested window end.
                        if eof > 0 && eof < window.end {
                            debug!("shrinking window end to actual end of file: {}", eof);
                            window.end = eof;
                        }
                    }
                    break;
                }
            };
            invalid_positions = 0;

            if offset >= window.end {
                break;
            }

            let header = match RecordHeader::read_from(&mut reader) {
                Ok(h) => h,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    trace!("end of stream at offset {}", offset);
                    break;
                }
                Err(e) => {
                    error!("read error at offset {}: {}", offset, e);
                    abort = Some(Error::stream(offset, e));
                    break;
                }
            };
            stats.records_seen += 1;
            let length = u64::from(header.length);

            if length > self.config.max_record_len {
                warn!(
                    "suspicious record length {} at offset {}, cursor no longer trusted",
                    length, offset
                );
                abort = Some(Error::corrupt_record(
                    offset,
                    length,
                    self.config.max_record_len,
                ));
                break;
            }

            if !window.contains_record(offset, length) {
                trace!(
                    "record at offset {} extends beyond the extraction range, skipping",
                    offset
                );
                stats.out_of_window += 1;
                if let Err(e) = reader.seek(SeekFrom::Current(length as i64)) {
                    error!("failed to skip past record at offset {}: {}", offset, e);
                    abort = Some(Error::stream(offset, e));
                    break;
                }
                continue;
            }

            if classifier.is_target(header.typ) {
                trace!(
                    "part-results record (type {}) at offset {} with length {}",
                    header.typ,
                    offset,
                    length
                );

                let mut payload = vec![0u8; usize::from(header.length)];
                if let Err(e) = reader.read_exact(&mut payload) {
                    error!("failed to read payload at offset {}: {}", offset, e);
                    abort = Some(Error::stream(offset, e));
                    break;
                }

                match PartResult::decode(&payload, offset) {
                    Ok(part) if part.is_plausible() => {
                        trace!(
                            "part: head={} site={} hard_bin={} soft_bin={}",
                            part.head_number,
                            part.site_number,
                            part.hard_bin,
                            part.soft_bin
                        );
                        records.push(part);
                        stats.parts_extracted += 1;
                        if stats.parts_extracted == 1 || stats.parts_extracted % 100 == 0 {
                            debug!("extracted {} part-results records so far", stats.parts_extracted);
                        }
                    }
                    Ok(part) => {
                        // Local and recoverable: drop just this record.
                        warn!(
                            "suspicious part-results values at offset {} (hard_bin={}, soft_bin={}), discarding",
                            offset, part.hard_bin, part.soft_bin
                        );
                        stats.parts_discarded += 1;
                    }
                    Err(e) => {
                        warn!("failed to decode part-results record at offset {}: {}", offset, e);
                        stats.parts_discarded += 1;
                    }
                }
            } else {
                if let Some(diag) = diagnostics.as_deref_mut() {
                    diag.observe(header.typ);
                }
                stats.records_skipped += 1;
                if let Err(e) = reader.seek(SeekFrom::Current(length as i64)) {
                    error!("failed to skip past record at offset {}: {}", offset, e);
                    abort = Some(Error::stream(offset, e));
                    break;
                }
            }
        }

        debug!(
            "scan complete: {} records seen, {} parts extracted, {} discarded",
            stats.records_seen, stats.parts_extracted, stats.parts_discarded
        );

        Extraction {
            records,
            window: Some(window),
            stats,
            abort,
        }
    }
}

/// Extracts Part Results from a file with default configuration.
///
/// This is a convenience function for one-off calls.
pub fn extract_file(path: impl AsRef<Path>, start: i64, end: i64) -> Result<Extraction> {
    Extractor::new().extract(path, start, end)
}

/// Extracts Part Results from a file with custom configuration.
pub fn extract_file_with_config(
    path: impl AsRef<Path>,
    start: i64,
    end: i64,
    config: ScannerConfig,
) -> Result<Extraction> {
    Extractor::with_config(config).extract(path, start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn record(typ: u8, sub: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + payload.len());
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.push(typ);
        out.push(sub);
        out.extend_from_slice(payload);
        out
    }

    fn far() -> Vec<u8> {
        record(FILE_HEADER_TYPE, 10, &[2, 4])
    }

    fn prr_payload(head: u8, site: u8, hard: i16, soft: i16, elapsed: u32, id: &str) -> Vec<u8> {
        let mut p = Vec::new();
        p.push(head);
        p.push(site);
        p.push(0);
        p.extend_from_slice(&1u16.to_le_bytes());
        p.extend_from_slice(&hard.to_le_bytes());
        p.extend_from_slice(&soft.to_le_bytes());
        p.extend_from_slice(&3i16.to_le_bytes());
        p.extend_from_slice(&4i16.to_le_bytes());
        p.extend_from_slice(&elapsed.to_le_bytes());
        p.push(id.len() as u8);
        p.extend_from_slice(id.as_bytes());
        p
    }

    fn fixture(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    /// The canonical three-record file: header, one good part, one part
    /// whose decoded values fail the plausibility guard.
    fn three_record_file() -> NamedTempFile {
        let mut bytes = far();
        bytes.extend(record(25, 20, &prr_payload(1, 1, 1, 2, 500, "P1")));
        bytes.extend(record(5, 20, &prr_payload(1, 1, -20_000, 2, 0, "P2")));
        fixture(&bytes)
    }

    #[test]
    fn test_three_record_scenario() {
        let file = three_record_file();
        let extraction = extract_file(file.path(), 0, -1).unwrap();

        assert_eq!(extraction.len(), 1);
        let part = &extraction.records[0];
        assert_eq!(part.hard_bin, 1);
        assert_eq!(part.soft_bin, 2);
        assert_eq!(part.head_number, 1);
        assert_eq!(part.site_number, 1);
        assert_eq!(part.elapsed_ms, 500);

        assert!(extraction.is_complete());
        assert_eq!(extraction.stats.records_seen, 3);
        assert_eq!(extraction.stats.parts_extracted, 1);
        assert_eq!(extraction.stats.parts_discarded, 1);
        assert_eq!(extraction.stats.records_skipped, 1);
    }

    #[test]
    fn test_scenario_document_round_trip() {
        let file = three_record_file();
        let extraction = extract_file(file.path(), 0, -1).unwrap();
        let document = crate::report::render(&extraction.records, 1_740_000_000).unwrap();

        // 500 ms of test time truncates to a zero-second start offset.
        assert!(document.contains("\"sot\": 1740000000"));
        assert!(document.contains("\"eot\": 1740000000"));
        assert!(document.contains("\"last_modified\": 1740000000"));
        assert!(document.contains("\"hard_bin\": 1"));
        assert!(document.contains("\"soft_bin\": 2"));
    }

    #[test]
    fn test_inverted_window_yields_empty() {
        let file = three_record_file();
        for (start, end) in [(10, 10), (50, 10), (0, 0)] {
            let extraction = extract_file(file.path(), start, end).unwrap();
            assert!(extraction.is_empty());
            assert!(extraction.is_complete());
            assert_eq!(extraction.window, None);
            assert_eq!(extraction.stats, ScanStats::default());
        }
    }

    #[test]
    fn test_start_past_file_end_yields_empty() {
        let file = fixture(&far());
        let extraction = extract_file(file.path(), 100, -1).unwrap();
        assert!(extraction.is_empty());
        assert!(extraction.is_complete());
    }

    #[test]
    fn test_missing_file_header() {
        let mut bytes = record(1, 10, &[0; 8]);
        bytes.extend(record(5, 20, &prr_payload(1, 1, 1, 2, 0, "P1")));
        let file = fixture(&bytes);

        let err = extract_file(file.path(), 0, -1).unwrap_err();
        assert!(matches!(err, Error::MissingFileHeader { found: 1 }));
    }

    #[test]
    fn test_unsupported_platform_and_version() {
        let mut bytes = record(FILE_HEADER_TYPE, 10, &[3, 4]);
        bytes.extend(record(5, 20, &prr_payload(1, 1, 1, 2, 0, "P1")));
        let file = fixture(&bytes);
        let err = extract_file(file.path(), 0, -1).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPlatform(3)));

        let mut bytes = record(FILE_HEADER_TYPE, 10, &[2, 3]);
        bytes.extend(record(5, 20, &prr_payload(1, 1, 1, 2, 0, "P1")));
        let file = fixture(&bytes);
        let err = extract_file(file.path(), 0, -1).unwrap_err();
        assert!(matches!(err, Error::UnsupportedVersion(3)));
    }

    #[test]
    fn test_gate_skipped_when_start_nonzero() {
        // Unsupported platform, but the window starts past the header
        // record, so the gate never runs.
        let mut bytes = record(FILE_HEADER_TYPE, 10, &[3, 4]);
        let gate_len = bytes.len() as i64;
        bytes.extend(record(5, 20, &prr_payload(2, 3, 1, 1, 0, "P9")));
        let file = fixture(&bytes);

        assert!(extract_file(file.path(), 0, -1).is_err());

        let extraction = extract_file(file.path(), gate_len, -1).unwrap();
        assert_eq!(extraction.len(), 1);
        assert_eq!(extraction.records[0].head_number, 2);
    }

    #[test]
    fn test_window_boundary_excludes_straddling_record() {
        let mut bytes = far();
        let part = record(25, 20, &prr_payload(1, 1, 1, 2, 500, "P1"));
        let part_start = bytes.len();
        bytes.extend(&part);
        let file = fixture(&bytes);

        // End lands inside the part record's payload.
        let cut = (part_start + part.len() - 3) as i64;
        let extraction = extract_file(file.path(), 0, cut).unwrap();
        assert!(extraction.is_empty());
        assert!(extraction.is_complete());
        assert_eq!(extraction.stats.out_of_window, 1);

        // One byte past the record end is enough.
        let full = (part_start + part.len()) as i64;
        let extraction = extract_file(file.path(), 0, full).unwrap();
        assert_eq!(extraction.len(), 1);
    }

    #[test]
    fn test_monotonic_cursor_over_mixed_records() {
        // Back-to-back records of varying lengths: every header lands
        // exactly where the previous record's declared length says.
        let mut bytes = far();
        bytes.extend(record(1, 10, &[0xAA; 17]));
        bytes.extend(record(25, 20, &prr_payload(1, 1, 1, 1, 100, "A")));
        bytes.extend(record(10, 30, &[0xBB; 3]));
        bytes.extend(record(5, 20, &prr_payload(1, 2, 2, 2, 200, "BB")));
        let file = fixture(&bytes);

        let extraction = extract_file(file.path(), 0, -1).unwrap();
        assert_eq!(extraction.stats.records_seen, 5);
        assert_eq!(extraction.len(), 2);
        assert_eq!(extraction.stats.records_skipped, 3);
        assert_eq!(extraction.records[0].site_number, 1);
        assert_eq!(extraction.records[1].site_number, 2);
    }

    #[test]
    fn test_corrupt_length_aborts_with_partial_results() {
        let config = ScannerConfig::new().max_record_len(40);
        let mut bytes = far();
        bytes.extend(record(5, 20, &prr_payload(1, 1, 1, 2, 0, "P1")));
        bytes.extend(record(5, 20, &[0u8; 60]));
        bytes.extend(record(5, 20, &prr_payload(1, 1, 3, 4, 0, "P2")));
        let file = fixture(&bytes);

        let extraction = extract_file_with_config(file.path(), 0, -1, config).unwrap();
        assert_eq!(extraction.len(), 1);
        assert_eq!(extraction.records[0].hard_bin, 1);
        assert!(matches!(
            extraction.abort,
            Some(Error::CorruptRecord { length: 60, .. })
        ));
    }

    #[test]
    fn test_bad_path_is_an_error() {
        let err = extract_file("/nonexistent/file.stdf", 0, -1).unwrap_err();
        assert!(matches!(err, Error::FileOpen { .. }));
    }

    #[test]
    fn test_idempotent_across_calls() {
        let file = three_record_file();
        let first = extract_file(file.path(), 0, -1).unwrap();
        let second = extract_file(file.path(), 0, -1).unwrap();
        assert_eq!(first.records, second.records);
        assert_eq!(first.stats, second.stats);
    }

    #[test]
    fn test_diagnostics_observe_unrecognized_codes() {
        let mut bytes = far();
        bytes.extend(record(1, 10, &[0; 4]));
        bytes.extend(record(1, 10, &[0; 4]));
        bytes.extend(record(2, 10, &[0; 4]));
        let file = fixture(&bytes);

        let mut diag = TypeDiagnostics::new();
        let extraction = Extractor::new()
            .extract_with_diagnostics(file.path(), 0, -1, Some(&mut diag))
            .unwrap();
        assert!(extraction.is_empty());
        assert_eq!(diag.count(1), 2);
        assert_eq!(diag.count(2), 1);
        assert_eq!(diag.count(FILE_HEADER_TYPE), 1);
    }

    #[test]
    fn test_window_normalize() {
        assert_eq!(
            ExtractionWindow::normalize(-5, -1, 100),
            Some(ExtractionWindow { start: 0, end: 100 })
        );
        assert_eq!(
            ExtractionWindow::normalize(0, 200, 100),
            Some(ExtractionWindow { start: 0, end: 100 })
        );
        assert_eq!(
            ExtractionWindow::normalize(10, 20, 100),
            Some(ExtractionWindow { start: 10, end: 20 })
        );
        assert_eq!(ExtractionWindow::normalize(10, 5, 100), None);
        assert_eq!(ExtractionWindow::normalize(100, -1, 50), None);
        assert_eq!(ExtractionWindow::normalize(0, -1, 0), None);
    }

    #[test]
    fn test_window_contains_record() {
        let window = ExtractionWindow { start: 10, end: 50 };
        assert!(window.contains_record(10, 36)); // exactly fills the window
        assert!(!window.contains_record(10, 37)); // one byte over
        assert!(!window.contains_record(9, 10)); // starts before the window
        assert!(window.contains_record(46, 0)); // empty payload at the edge
        assert!(!window.contains_record(47, 0));
        assert!(!window.contains_record(10, MAX_RECORD_LEN + 1));
        assert!(!window.contains_record(u64::MAX - 2, 10));
    }

    /// Read/Seek wrapper whose position probes fail, standing in for a
    /// cursor invalidated under a concurrently growing file.
    struct FlakyPosition<R> {
        inner: R,
    }

    impl<R: Read> Read for FlakyPosition<R> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl<R: Seek> Seek for FlakyPosition<R> {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            if matches!(pos, SeekFrom::Current(0)) {
                return Err(std::io::Error::other("cursor lost"));
            }
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_invalid_position_self_heals_below_threshold() {
        let mut bytes = far();
        bytes.extend(record(5, 20, &prr_payload(1, 1, 1, 2, 0, "P1")));
        let len = bytes.len() as u64;
        let reader = FlakyPosition {
            inner: Cursor::new(bytes),
        };

        let window = ExtractionWindow {
            start: 0,
            end: len + 100,
        };
        let extraction = Extractor::new().run(reader, window, None);

        // Self-heal shrinks the window to the true end of file and stops
        // the attempt cleanly.
        assert!(extraction.is_complete());
        assert_eq!(extraction.window.unwrap().end, len);
    }

    #[test]
    fn test_invalid_position_aborts_at_threshold() {
        let reader = FlakyPosition {
            inner: Cursor::new(far()),
        };
        let window = ExtractionWindow { start: 0, end: 6 };
        let config = ScannerConfig::new().max_invalid_positions(1);
        let extraction = Extractor::with_config(config).run(reader, window, None);

        assert!(matches!(
            extraction.abort,
            Some(Error::CursorLost { attempts: 1 })
        ));
    }
}
