//! Error types for the cache core.
//!
//! Store operations never surface these to the host application: they are
//! produced by internal helpers, logged, and folded into a miss,
//! a [`WriteOutcome`](crate::WriteOutcome) or `false`. The HTTP facade and
//! the CLI are the only places that report them directly.

use thiserror::Error;

use crate::codec::CodecError;
use crate::transport::TransportError;

/// Errors that can occur while reading or writing cached values.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Caching is switched off in configuration.
    #[error("cache disabled by configuration")]
    Disabled,

    /// Error from the KV transport.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The connectivity probe did not read back what it wrote.
    #[error("health check failed: {0}")]
    HealthCheck(String),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Chunking parameters were invalid.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Stored pieces disagree with their info record.
    #[error("corrupted cache entry '{key}': {reason}")]
    Corrupted { key: String, reason: String },

    /// A single piece is still too large after chunking or batching.
    #[error("'{key}' is {size} bytes, limit is {limit}")]
    Oversize {
        key: String,
        size: usize,
        limit: usize,
    },
}

/// A [`Result`] type alias using [`CacheError`].
pub type Result<T> = std::result::Result<T, CacheError>;

impl CacheError {
    pub(crate) fn corrupted(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Corrupted {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error means the backend could not be reached or
    /// is switched off, rather than a problem with a particular value.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Disabled | Self::HealthCheck(_) | Self::Transport(_)
        )
    }
}
