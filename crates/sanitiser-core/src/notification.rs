//! Object-created notification batches
//!
//! The payload is the S3 event document:
//!
//! ```json
//! { "Records": [ { "eventName": "ObjectCreated:Put",
//!                  "s3": { "bucket": { "name": "in" }, "object": { "key": "a%20b.jpg" } } } ] }
//! ```
//!
//! Only the top level is all-or-nothing. Each record is parsed on its own so a
//! single bad record turns into a [`RecordEntry::Invalid`] instead of failing
//! the whole batch.

use std::string::FromUtf8Error;

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

/// Prefix shared by all object-creation event names
pub const OBJECT_CREATED_PREFIX: &str = "ObjectCreated:";

/// A validated object-creation notification for one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    source_bucket: String,
    source_key: String,
    event_name: Option<String>,
    size: Option<u64>,
}

impl ChangeRecord {
    /// Build a record from already decoded parts
    pub fn new<B, K>(source_bucket: B, source_key: K, event_name: Option<String>) -> Self
    where
        B: Into<String>,
        K: Into<String>,
    {
        Self {
            source_bucket: source_bucket.into(),
            source_key: source_key.into(),
            event_name,
            size: None,
        }
    }

    /// Bucket the object was created in
    pub fn source_bucket(&self) -> &str {
        &self.source_bucket
    }

    /// Decoded object key
    pub fn source_key(&self) -> &str {
        &self.source_key
    }

    /// Event name, absent in bare test events
    pub fn event_name(&self) -> Option<&str> {
        self.event_name.as_deref()
    }

    /// Object size reported by the notification
    pub fn size(&self) -> Option<u64> {
        self.size
    }
}

/// One element of a batch, in batch order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordEntry {
    /// A record eligible for sanitisation
    Valid(ChangeRecord),
    /// A record rejected before any store access
    Invalid {
        /// Best-effort key (raw if it could not be decoded, empty if absent)
        key: String,
        /// Why the record was rejected
        reason: String,
    },
}

impl RecordEntry {
    /// Key used to correlate the entry's outcome
    pub fn key(&self) -> &str {
        match self {
            Self::Valid(record) => record.source_key(),
            Self::Invalid { key, .. } => key,
        }
    }
}

/// An ordered batch of notifications
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationBatch {
    entries: Vec<RecordEntry>,
}

#[derive(Deserialize)]
struct RawBatch {
    #[serde(rename = "Records", alias = "records", default)]
    records: Vec<Value>,
}

#[derive(Deserialize)]
struct RawEntity {
    bucket: RawBucket,
    object: RawObject,
}

#[derive(Deserialize)]
struct RawBucket {
    name: String,
}

#[derive(Deserialize)]
struct RawObject {
    key: String,
    #[serde(default)]
    size: Option<u64>,
}

impl NotificationBatch {
    /// Parse a batch from raw JSON bytes
    ///
    /// # Errors
    /// * `BatchMalformed` - If the bytes are not JSON or do not have the batch shape
    pub fn from_slice(payload: &[u8]) -> Result<Self, Error> {
        let value: Value = serde_json::from_slice(payload)?;
        Self::from_value(&value)
    }

    /// Parse a batch from an already decoded JSON value
    ///
    /// # Errors
    /// * `BatchMalformed` - If the top level is not an object or its `Records` is not an array
    pub fn from_value(payload: &Value) -> Result<Self, Error> {
        if !payload.is_object() {
            return Err(Error::BatchMalformed(
                "notification payload is not a JSON object".to_string(),
            ));
        }
        let raw = RawBatch::deserialize(payload)?;
        let entries = raw.records.iter().map(parse_record).collect();
        Ok(Self { entries })
    }

    /// Entries in batch order
    pub fn entries(&self) -> &[RecordEntry] {
        &self.entries
    }

    /// Consume the batch, yielding its entries in order
    pub fn into_entries(self) -> Vec<RecordEntry> {
        self.entries
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch holds no records
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether `event_name` denotes an object-creation event.
///
/// Records without an event name (bare test events) are treated as creations.
pub fn is_creation_event(event_name: Option<&str>) -> bool {
    event_name.is_none_or(|name| name.starts_with(OBJECT_CREATED_PREFIX))
}

/// Decode an object key as it appears in notifications.
///
/// Keys are form-urlencoded: `+` stands for a space and everything else is
/// percent-encoded UTF-8.
///
/// # Errors
/// * If the percent-decoded bytes are not valid UTF-8
pub fn decode_object_key(raw: &str) -> Result<String, FromUtf8Error> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced).map(|decoded| decoded.into_owned())
}

fn parse_record(record: &Value) -> RecordEntry {
    let entity = record.get("s3").unwrap_or(record);
    let raw_key = entity
        .pointer("/object/key")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let event_name = match record.get("eventName") {
        None | Some(Value::Null) => None,
        Some(Value::String(name)) => Some(name.clone()),
        Some(other) => {
            return RecordEntry::Invalid {
                key: raw_key,
                reason: format!("eventName is not a string: {other}"),
            };
        }
    };

    if !is_creation_event(event_name.as_deref()) {
        return RecordEntry::Invalid {
            key: raw_key,
            reason: format!(
                "event {} is not an object-creation event",
                event_name.unwrap_or_default()
            ),
        };
    }

    let entity = match RawEntity::deserialize(entity) {
        Ok(entity) => entity,
        Err(e) => {
            return RecordEntry::Invalid {
                key: raw_key,
                reason: format!("malformed record: {e}"),
            };
        }
    };

    if entity.bucket.name.is_empty() || entity.object.key.is_empty() {
        return RecordEntry::Invalid {
            key: raw_key,
            reason: "record has an empty bucket name or object key".to_string(),
        };
    }

    match decode_object_key(&entity.object.key) {
        Ok(key) => RecordEntry::Valid(ChangeRecord {
            source_bucket: entity.bucket.name,
            source_key: key,
            event_name,
            size: entity.object.size,
        }),
        Err(e) => RecordEntry::Invalid {
            key: raw_key,
            reason: format!("object key is not valid UTF-8 once decoded: {e}"),
        },
    }
}
