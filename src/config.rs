//! Cache and transport configuration.
//!
//! Both sections are read from the same TOML file the binaries use:
//!
//! ```toml
//! [transport]
//! backend = "rest"
//! url = "https://example-kv.upstash.io"
//! token = "..."
//!
//! [cache]
//! enabled = true
//! max_value_bytes = 100000
//! chunk_size = 80000
//! batch_size = 20
//! ```
//!
//! Every field has a default, so an empty file is valid.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_MAX_VALUE_BYTES: usize = 100_000;
const DEFAULT_CHUNK_SIZE: usize = 80_000;
const DEFAULT_BATCH_SIZE: usize = 20;
const DEFAULT_NOVEL_TTL_SECS: u64 = 3_600;
const DEFAULT_FEATURED_TTL_SECS: u64 = 3_600;
const DEFAULT_RANKING_TTL_SECS: u64 = 86_400;
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Cache behavior.
///
/// Built once at startup and handed to every store; nothing reads caching
/// switches from globals.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Master switch. When off every operation reports the cache unavailable.
    pub enabled: bool,
    /// Run the connectivity probe before each operation.
    pub health_check: bool,
    /// Hard per-value ceiling of the KV store.
    pub max_value_bytes: usize,
    /// Byte size of blob chunks; kept below `max_value_bytes`.
    pub chunk_size: usize,
    /// Blobs up to this many bytes are stored as a single entry.
    /// Defaults to `chunk_size`.
    pub direct_threshold: Option<usize>,
    /// Items per collection batch.
    pub batch_size: usize,
    /// TTL of the novel catalog.
    pub novel_ttl_secs: u64,
    /// TTL of the featured novel categories.
    pub featured_ttl_secs: u64,
    /// TTL of the ranking lists.
    pub ranking_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            health_check: true,
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
            chunk_size: DEFAULT_CHUNK_SIZE,
            direct_threshold: None,
            batch_size: DEFAULT_BATCH_SIZE,
            novel_ttl_secs: DEFAULT_NOVEL_TTL_SECS,
            featured_ttl_secs: DEFAULT_FEATURED_TTL_SECS,
            ranking_ttl_secs: DEFAULT_RANKING_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// Chunk size actually used: never zero, never above the value ceiling.
    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.min(self.max_value_bytes).max(1)
    }

    /// Largest serialized blob written without chunking.
    pub fn effective_direct_threshold(&self) -> usize {
        self.direct_threshold
            .unwrap_or(self.chunk_size)
            .min(self.max_value_bytes)
    }

    /// Batch size actually used: never zero.
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.max(1)
    }

    pub fn novel_ttl(&self) -> Duration {
        Duration::from_secs(self.novel_ttl_secs)
    }

    pub fn featured_ttl(&self) -> Duration {
        Duration::from_secs(self.featured_ttl_secs)
    }

    pub fn ranking_ttl(&self) -> Duration {
        Duration::from_secs(self.ranking_ttl_secs)
    }
}

/// Which KV backend to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Remote REST command endpoint.
    #[default]
    Rest,
    /// In-process store (development and tests).
    Memory,
}

/// Connection settings for the KV store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub backend: Backend,
    /// REST endpoint URL.
    pub url: Option<String>,
    /// Bearer token.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Value ceiling enforced by the memory backend.
    pub max_value_bytes: Option<usize>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            url: None,
            token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_value_bytes: None,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The `[transport]` and `[cache]` sections of a config file.
///
/// Other sections (such as the server's) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub transport: TransportConfig,
    pub cache: CacheConfig,
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().display().to_string(), e))?;
        Self::from_toml(&content)
    }

    /// Parse settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(String, std::io::Error),
    /// TOML parse error.
    Parse(toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Failed to read config file '{}': {}", path, e),
            ConfigError::Parse(e) => write!(f, "Failed to parse config: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
