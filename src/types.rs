//! Records persisted next to cached values, and operation results.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Physical key of the info record for `logical`.
pub fn info_key(logical: &str) -> String {
    format!("{}:info", logical)
}

/// Physical key of chunk or batch `index` for `logical`.
pub fn chunk_key(logical: &str, index: u32) -> String {
    format!("{}:chunk:{}", logical, index)
}

/// Physical key of `category` under `prefix`.
pub fn category_key(prefix: &str, category: &str) -> String {
    format!("{}:{}", prefix, category)
}

/// Metadata for a byte-chunked blob, stored at `key:info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkInfo {
    pub chunk_count: u32,
    /// Byte length of the serialized value before chunking.
    pub total_length: u64,
    pub created_at: DateTime<Utc>,
}

impl ChunkInfo {
    pub fn new(chunk_count: u32, total_length: u64) -> Self {
        Self {
            chunk_count,
            total_length,
            created_at: Utc::now(),
        }
    }
}

/// Metadata for a batch-chunked collection, stored at `prefix:info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    pub total_items: u64,
    /// Number of batches written.
    pub chunks: u32,
    pub updated_at: DateTime<Utc>,
}

/// Index of populated categories, stored at `prefix:info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInfo {
    pub categories: BTreeSet<String>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryInfo {
    pub fn new(categories: BTreeSet<String>) -> Self {
        Self {
            categories,
            updated_at: Utc::now(),
        }
    }
}

/// Result of a cache write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every piece was written.
    Stored,
    /// Some pieces were written; the named ones were skipped or failed.
    Partial { skipped: Vec<String> },
    /// Nothing usable was written.
    Failed,
    /// The health gate refused the operation; nothing was attempted.
    Unavailable,
}

impl WriteOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, Self::Stored)
    }

    /// `true` for `Stored` and `Partial`.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Stored | Self::Partial { .. })
    }

    /// Short machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Partial { .. } => "partial",
            Self::Failed => "failed",
            Self::Unavailable => "unavailable",
        }
    }
}

/// A blob value: structured JSON or an opaque string.
#[derive(Debug, Clone, PartialEq)]
pub enum BlobValue {
    Json(Value),
    Text(String),
}

impl BlobValue {
    /// Serialized form written to the store. Text passes through unchanged.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Json(value) => serde_json::to_string(value),
            Self::Text(text) => Ok(text.clone()),
        }
    }

    /// Decode a stored string: JSON when it parses, text otherwise.
    pub fn decode(raw: String) -> Self {
        match serde_json::from_str(&raw) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(raw),
        }
    }

    /// View as JSON; text becomes a JSON string.
    pub fn into_json(self) -> Value {
        match self {
            Self::Json(value) => value,
            Self::Text(text) => Value::String(text),
        }
    }
}

impl From<Value> for BlobValue {
    /// A JSON string is treated as text so it is stored without quotes.
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Json(other),
        }
    }
}

impl From<String> for BlobValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for BlobValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}
