//! Transfer-progress message schema.
//!
//! The transfer side announces each newly delivered byte range with a
//! small JSON message, and field formats vary by producer: byte positions
//! arrive as plain integers or comma-grouped numeric strings (the
//! transfer tool prints them grouped), timestamps as epoch seconds or a
//! formatted local time. The schema normalizes all of them up front so
//! the scanner only ever sees clean integers.
//!
//! Delivery guarantees belong to the messaging layer and are not modeled
//! here; this module owns the field contract only.

use crate::error::{Error, Result};
use chrono::{Local, NaiveDateTime, TimeZone};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Timestamp layouts the transfer tool has been seen emitting
const SYNC_TIME_FORMATS: [&str; 2] = ["%Y/%m/%d %H:%M:%S%.3f", "%Y/%m/%d %H:%M:%S"];

/// One transfer-progress announcement.
///
/// `previous_position..read_position` is the byte window the next
/// extraction call should scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMessage {
    /// Name of the file being transferred
    #[serde(alias = "temp_file_name")]
    pub file_name: String,
    /// Transferred byte count reported by the prior announcement
    #[serde(deserialize_with = "de_position", default)]
    pub previous_position: u64,
    /// Transferred byte count reported by this announcement
    #[serde(deserialize_with = "de_position")]
    pub read_position: u64,
    /// Reference timestamp, seconds since epoch
    #[serde(deserialize_with = "de_sync_time", default = "now_epoch")]
    pub sync_time: i64,
}

impl SyncMessage {
    /// Parses a message from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::sync_field("message", e.to_string()))
    }

    /// Serializes the message back to JSON text.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::internal(e.to_string()))
    }

    /// The byte window this message announces, as signed extraction bounds.
    pub fn window(&self) -> (i64, i64) {
        (clamp_to_i64(self.previous_position), clamp_to_i64(self.read_position))
    }

    /// The follow-up announcement after the transfer reports
    /// `read_position` delivered bytes: this message's count becomes the
    /// new previous position.
    pub fn advance(&self, read_position: u64, sync_time: i64) -> Self {
        Self {
            file_name: self.file_name.clone(),
            previous_position: self.read_position,
            read_position,
            sync_time,
        }
    }
}

/// Parses a timestamp that may be epoch seconds or a formatted local time.
///
/// An unparseable value defaults to the current time; a late default is
/// better than dropping the announcement.
pub fn parse_sync_time(text: &str) -> i64 {
    let trimmed = text.trim();
    if let Ok(epoch) = trimmed.parse::<i64>() {
        return epoch;
    }
    for format in SYNC_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            if let Some(local) = Local.from_local_datetime(&naive).earliest() {
                return local.timestamp();
            }
        }
    }
    warn!("unparseable sync_time '{}', defaulting to current time", text);
    now_epoch()
}

/// Normalizes a numeric string that may carry digit-group commas.
fn parse_grouped(text: &str) -> Result<u64> {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() || !cleaned.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::sync_field(
            "position",
            format!("'{}' is not a byte count", text),
        ));
    }
    cleaned
        .parse()
        .map_err(|e| Error::sync_field("position", format!("'{}': {}", text, e)))
}

fn clamp_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn now_epoch() -> i64 {
    Local::now().timestamp()
}

fn de_position<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => parse_grouped(&text).map_err(de::Error::custom),
    }
}

fn de_sync_time<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Epoch(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Epoch(value) => value,
        Raw::Text(text) => parse_sync_time(&text),
    })
}
