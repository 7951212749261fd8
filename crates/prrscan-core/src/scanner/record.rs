//! Low-level STDF record decoding.
//!
//! This module implements the container-format decode needed to walk a
//! record stream and extract Part Results payloads.
//!
//! ## Record Format Overview
//!
//! Every record starts with a 4-byte little-endian header:
//! - 2 bytes: payload length (header excluded)
//! - 1 byte: record type code
//! - 1 byte: record subtype code
//!
//! The payload layout depends on the type. Only two payloads are decoded
//! here: the file-attributes record (type 0, mandatory first record) and
//! the part-results record. Everything else is skipped by declared length.

use crate::error::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use bytes::Buf;
use std::io::Read;

/// Size of the fixed record header in bytes
pub const HEADER_SIZE: u64 = 4;

/// Reserved type code of the mandatory file-attributes record
pub const FILE_HEADER_TYPE: u8 = 0;

/// Marker value for an absent wafer coordinate
const COORD_MISSING: i16 = -32768;

/// Fixed-size prefix of a part-results payload, through the soft bin
const PART_RESULT_MIN_LEN: usize = 9;

/// The 4-byte header prefixing every record in the stream.
///
/// Ephemeral: one instance lives per scan step and is never retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// Declared payload byte count (header excluded)
    pub length: u16,
    /// Record type code
    pub typ: u8,
    /// Record subtype code
    pub sub: u8,
}

impl RecordHeader {
    /// Reads a header from the stream at its current position.
    pub fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let length = reader.read_u16::<LittleEndian>()?;
        let typ = reader.read_u8()?;
        let sub = reader.read_u8()?;
        Ok(Self { length, typ, sub })
    }

    /// Total bytes this record occupies in the stream, header included.
    pub fn total_len(&self) -> u64 {
        HEADER_SIZE + u64::from(self.length)
    }
}

/// File-attributes payload: originating platform and format version.
///
/// Validated once per call when the window starts at offset 0, never retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttributes {
    /// CPU type code of the producing platform
    pub cpu_type: u8,
    /// Container format version
    pub format_version: u8,
}

impl FileAttributes {
    /// The only platform this system ingests data from
    pub const SUPPORTED_CPU_TYPE: u8 = 2;
    /// The only format version this system ingests
    pub const SUPPORTED_VERSION: u8 = 4;

    /// Decodes the two-byte file-attributes payload.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        if payload.len() < 2 {
            return Err(Error::truncated_record(
                0,
                format!(
                    "file-attributes payload is {} bytes, need 2",
                    payload.len()
                ),
            ));
        }
        Ok(Self {
            cpu_type: payload[0],
            format_version: payload[1],
        })
    }

    /// Whether this platform/version pair is the supported one.
    pub fn is_supported(&self) -> bool {
        self.cpu_type == Self::SUPPORTED_CPU_TYPE && self.format_version == Self::SUPPORTED_VERSION
    }
}

/// Flag bits describing one tested part's disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartFlags {
    /// Part was retested and this result is superseded
    pub superseded: bool,
    /// Test ended abnormally
    pub abnormal: bool,
    /// Part failed
    pub failed: bool,
    /// The pass/fail bit carries no information
    pub invalid: bool,
}

impl PartFlags {
    /// Decodes the packed flag byte.
    ///
    /// Bits 0 and 1 both mean a retest superseded this result (one keys on
    /// part id, the other on coordinates); they collapse into one flag here.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            superseded: byte & 0b0000_0011 != 0,
            abnormal: byte & 0b0000_0100 != 0,
            failed: byte & 0b0000_1000 != 0,
            invalid: byte & 0b0001_0000 != 0,
        }
    }
}

/// One decoded Part Results record.
///
/// Owned by the extraction result from decode until the caller drops it.
#[derive(Debug, Clone, PartialEq)]
pub struct PartResult {
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
    pub elapsed_ms: u32,
    /// Wafer X coordinate, when present
    pub x_coord: Option<i16>,
    /// Wafer Y coordinate, when present
    pub y_coord: Option<i16>,
    /// Part disposition flags
    pub flags: PartFlags,
    /// Part identifier string, when present
    pub part_id: Option<String>,
    /// Part description text, when present
    pub part_text: Option<String>,
}

impl PartResult {
    /// Decodes a part-results payload.
    ///
    /// Fields through the soft bin are required; the payload may end at any
    /// point after them and the remaining fields default to absent. `offset`
    /// is the record's position in the stream, used for error context only.
    pub fn decode(payload: &[u8], offset: u64) -> Result<Self> {
        let mut buf = payload;
        if buf.remaining() < PART_RESULT_MIN_LEN {
            return Err(Error::truncated_record(
                offset,
                format!(
                    "part-results payload is {} bytes, need at least {}",
                    buf.remaining(),
                    PART_RESULT_MIN_LEN
                ),
            ));
        }

        let head_number = buf.get_u8();
        let site_number = buf.get_u8();
        let flags = PartFlags::from_byte(buf.get_u8());
        let test_count = buf.get_u16_le();
        let hard_bin = i32::from(buf.get_i16_le());
        let soft_bin = i32::from(buf.get_i16_le());

        let x_coord = if buf.remaining() >= 2 {
            coord(buf.get_i16_le())
        } else {
            None
        };
        let y_coord = if buf.remaining() >= 2 {
            coord(buf.get_i16_le())
        } else {
            None
        };
        let elapsed_ms = if buf.remaining() >= 4 {
            buf.get_u32_le()
        } else {
            0
        };

        let part_id = read_string(&mut buf);
        let part_text = read_string(&mut buf);
        // A trailing repair-bitmap field may follow; nothing here uses it.

        Ok(Self {
            head_number,
            site_number,
            test_count,
            hard_bin,
            soft_bin,
            elapsed_ms,
            x_coord,
            y_coord,
            flags,
            part_id,
            part_text,
        })
    }

    /// Validity guard against garbage decoded from a misclassified record.
    ///
    /// Bin numbers far below zero mean the payload was not a real part
    /// result. Head and site are single bytes on the wire, nothing to check.
    pub fn is_plausible(&self) -> bool {
        const MIN_BIN: i32 = -10_000;
        self.hard_bin >= MIN_BIN && self.soft_bin >= MIN_BIN
    }
}

fn coord(raw: i16) -> Option<i16> {
    (raw != COORD_MISSING).then_some(raw)
}

/// Reads a length-prefixed string field; absent or truncated means `None`.
fn read_string(buf: &mut &[u8]) -> Option<String> {
    if buf.remaining() < 1 {
        return None;
    }
    let len = buf.get_u8() as usize;
    if buf.remaining() < len {
        return None;
    }
    let bytes = buf.copy_to_bytes(len);
    Some(String::from_utf8_lossy(&bytes).into_owned())
}
