//! Convenient re-exports for common usage patterns.
//!
//! ```ignore
//! use novel_cache::prelude::*;
//!
//! let client = CacheClient::new(MemoryTransport::new(), CacheConfig::default());
//! let blobs = BlobStore::new(client);
//! blobs.set_json("greeting", &"hello", Duration::from_secs(60)).await;
//! ```

pub use std::time::Duration;

// Error handling
pub use crate::error::{CacheError, Result};

// Configuration
pub use crate::config::{Backend, CacheConfig, Settings, TransportConfig};

// Transports
#[cfg(feature = "http")]
pub use crate::transport::HttpTransport;
pub use crate::transport::{KvTransport, MemoryTransport, Transport, TransportError};

// Stores
pub use crate::blob::BlobStore;
pub use crate::category::CategoryCache;
pub use crate::client::CacheClient;
pub use crate::collection::{CollectionCache, CollectionSnapshot};
pub use crate::novels::{NovelCache, Rankings};

// Values and results
pub use crate::types::{BlobValue, WriteOutcome};
