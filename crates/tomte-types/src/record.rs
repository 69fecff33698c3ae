//! Versioned storage record and cache entry wrappers.
//!
//! Every durable value is stored wrapped in a [`VersionedRecord`] carrying
//! the semantic version of the application that wrote it. Reads classify the
//! stored text into an explicit [`DecodedRecord`] before acting on it, so
//! legacy (pre-versioning) data and decode failures are handled by
//! exhaustive matching instead of shape probing.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A durable value wrapped with the semantic-version stamp of the writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedRecord<T> {
    pub version: String,
    pub data: T,
    pub updated_at: DateTime<Utc>,
}

impl<T> VersionedRecord<T> {
    /// Wrap a value with the given version stamp, timestamped now.
    pub fn new(version: &Version, data: T) -> Self {
        Self {
            version: version.to_string(),
            data,
            updated_at: Utc::now(),
        }
    }

    /// The major component of the stored version stamp, if it parses.
    pub fn major(&self) -> Option<u64> {
        Version::parse(&self.version).ok().map(|v| v.major)
    }
}

/// A cached value with its write timestamp, used where TTL eviction applies.
///
/// An entry older than its TTL is indistinguishable from absent on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub value: T,
    /// Write time in epoch milliseconds.
    pub timestamp: i64,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, timestamp: i64) -> Self {
        Self { value, timestamp }
    }

    /// Whether this entry is still live at `now_ms` for the given TTL.
    pub fn is_fresh(&self, now_ms: i64, ttl_ms: i64) -> bool {
        now_ms - self.timestamp < ttl_ms
    }
}

/// Explicit classification of a stored value read back from the store.
///
/// `Versioned` keeps the payload as raw JSON because data written under an
/// older major version may not deserialize into the current shape; the
/// caller decides whether to migrate or decode it directly.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedRecord {
    /// Decoded to the versioned-record shape (payload left raw).
    Versioned(VersionedRecord<serde_json::Value>),
    /// Pre-versioning data: structured JSON lacking the record shape, or
    /// unstructured text carried as a JSON string.
    Legacy(serde_json::Value),
    /// Nothing stored under the key.
    Empty,
}

impl DecodedRecord {
    /// Classify the raw stored text (or its absence) for a key.
    pub fn classify(stored: Option<&str>) -> Self {
        let Some(text) = stored else {
            return DecodedRecord::Empty;
        };

        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            // Not JSON at all: legacy plain text.
            Err(_) => return DecodedRecord::Legacy(serde_json::Value::String(text.to_string())),
        };

        let has_record_shape = value
            .as_object()
            .is_some_and(|obj| obj.get("version").is_some_and(|v| v.is_string()) && obj.contains_key("data"));

        if has_record_shape {
            match serde_json::from_value::<VersionedRecord<serde_json::Value>>(value.clone()) {
                Ok(record) => DecodedRecord::Versioned(record),
                Err(_) => DecodedRecord::Legacy(value),
            }
        } else {
            DecodedRecord::Legacy(value)
        }
    }
}

/// Decode a raw JSON payload into `T`, if it fits the current shape.
pub fn decode_data<T: DeserializeOwned>(data: serde_json::Value) -> Option<T> {
    serde_json::from_value(data).ok()
}
