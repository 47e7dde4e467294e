//! Error types for the KV transport module.

use thiserror::Error;

/// Errors raised by a [`KvTransport`](super::KvTransport) call.
///
/// Every variant is non-fatal to the cache layer: callers log it and degrade
/// to a miss or a failed write.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("KV transport is not configured (missing url or token)")]
    Unconfigured,

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("KV store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("KV store error: {0}")]
    Envelope(String),

    #[error("Unexpected KV reply to {command}: {reply}")]
    UnexpectedReply { command: &'static str, reply: String },

    #[error("Value for '{key}' is {size} bytes, store limit is {limit}")]
    ValueTooLarge {
        key: String,
        size: usize,
        limit: usize,
    },

    #[error("KV store unavailable")]
    Unavailable,
}

impl TransportError {
    /// Returns `true` if the backend was never configured, as opposed to
    /// configured but failing.
    pub fn is_unconfigured(&self) -> bool {
        matches!(self, Self::Unconfigured)
    }
}
