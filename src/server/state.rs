//! Application state management.

use std::time::Duration;

use crate::blob::BlobStore;
use crate::client::CacheClient;
use crate::config::CacheConfig;
use crate::transport::{KvTransport, Transport, TransportError};

use super::config::Config;

/// Shared application state.
#[derive(Clone, Debug)]
pub struct AppState {
    blobs: BlobStore,
    default_ttl: Duration,
}

impl AppState {
    /// Create a new AppState from configuration.
    pub fn from_config(config: &Config) -> Result<Self, StateError> {
        let transport = Transport::from_config(&config.transport).map_err(StateError::Transport)?;
        if !transport.is_configured() {
            tracing::warn!("no KV store configured, every cache request will be unavailable");
        }
        Ok(Self::new(
            transport,
            config.cache.clone(),
            Duration::from_secs(config.server.default_ttl_secs),
        ))
    }

    pub fn new(
        transport: impl KvTransport + 'static,
        cache: CacheConfig,
        default_ttl: Duration,
    ) -> Self {
        Self {
            blobs: BlobStore::new(CacheClient::new(transport, cache)),
            default_ttl,
        }
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    pub fn client(&self) -> &CacheClient {
        self.blobs.client()
    }

    /// TTL applied when a write does not name one.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

/// Errors that can occur when setting up application state.
#[derive(Debug)]
pub enum StateError {
    /// The KV transport could not be built.
    Transport(TransportError),
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateError::Transport(e) => write!(f, "Failed to set up KV transport: {}", e),
        }
    }
}

impl std::error::Error for StateError {}
