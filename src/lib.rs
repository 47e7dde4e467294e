//! Chunked caching over a size-limited remote key-value store.
//!
//! Large values are sharded into bounded chunks with a metadata record, lists
//! are stored as item-count batches, and small named categories are cached
//! side by side under a shared index. Every read is fail-safe: anything
//! missing or inconsistent is a miss, and the caller goes to its backing
//! store.
//!
//! # Quick Start
//!
//! ```ignore
//! use novel_cache::prelude::*;
//!
//! let settings = Settings::from_file("novel-cache.toml")?;
//! let transport = Transport::from_config(&settings.transport)?;
//! let cache = NovelCache::new(CacheClient::new(transport, settings.cache));
//!
//! cache.set_novel_cache(&novels).await;
//! let novels: Option<Vec<Novel>> = cache.get_novel_cache().await;
//! ```
//!
//! # Modules
//!
//! - [`transport`] - Async get/set/delete against the KV store
//! - [`codec`] - Splitting and joining of payloads
//! - [`blob`] - One value across many chunk keys
//! - [`collection`] - Lists stored as batches
//! - [`category`] - Independently invalidatable named categories
//! - [`novels`] - Catalog, featured and ranking caches
//! - [`server`] - HTTP facade (requires `server` feature)
//!
//! # Feature Flags
//!
//! - `http` - REST transport (enabled by default)
//! - `logging` - Library-level tracing (enabled by default; consumers provide their own subscriber)
//! - `cli` - Command-line interface binary
//! - `server` - HTTP facade server
//! - `full` - Enable all features

mod logging;

pub mod blob;
pub mod category;
pub mod client;
pub mod codec;
pub mod collection;
pub mod config;
pub mod health;
pub mod novels;
pub mod prelude;
#[cfg(feature = "server")]
pub mod server;
pub mod transport;
pub mod types;

mod error;

pub use error::{CacheError, Result};

pub use blob::BlobStore;
pub use category::CategoryCache;
pub use client::CacheClient;
pub use codec::CodecError;
pub use collection::{CollectionCache, CollectionSnapshot};
pub use config::{Backend, CacheConfig, ConfigError, Settings, TransportConfig};
pub use novels::{NovelCache, Rankings};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{KvTransport, MemoryTransport, Transport, TransportError};
pub use types::{BlobValue, ChunkInfo, CollectionInfo, CategoryInfo, WriteOutcome};
