//! Common test utilities and fixtures.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use novel_cache::health::HEALTH_KEY;
use novel_cache::{CacheClient, CacheConfig, KvTransport, MemoryTransport, TransportError};

// =============================================================================
// Fixtures
// =============================================================================

/// A catalog entry as the host application stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Novel {
    pub id: String,
    pub title: String,
    pub view_count: u64,
}

/// `count` novels with ids `n0..n{count}`.
pub fn novels(count: usize) -> Vec<Novel> {
    (0..count)
        .map(|i| Novel {
            id: format!("n{}", i),
            title: format!("Novel number {}", i),
            view_count: (i as u64) * 10,
        })
        .collect()
}

/// A memory-backed client with default cache settings.
pub fn memory_client() -> (MemoryTransport, CacheClient) {
    let kv = MemoryTransport::new();
    let client = CacheClient::new(kv.clone(), CacheConfig::default());
    (kv, client)
}

/// Every live key except the health probe.
pub async fn data_keys(kv: &MemoryTransport) -> Vec<String> {
    kv.keys()
        .await
        .into_iter()
        .filter(|k| k != HEALTH_KEY)
        .collect()
}

// =============================================================================
// Recording Transport
// =============================================================================

/// Wraps a [`MemoryTransport`] and logs every mutating call as
/// `"SET key"` / `"DEL key"`, in call order. Probe writes are not logged.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    inner: MemoryTransport,
    log: Arc<Mutex<Vec<String>>>,
}

impl RecordingTransport {
    pub fn new(inner: MemoryTransport) -> Self {
        Self {
            inner,
            log: Arc::default(),
        }
    }

    pub fn ops(&self) -> Vec<String> {
        self.log.lock().map(|log| log.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut log) = self.log.lock() {
            log.clear();
        }
    }

    fn record(&self, op: &str, key: &str) {
        if key == HEALTH_KEY {
            return;
        }
        if let Ok(mut log) = self.log.lock() {
            log.push(format!("{} {}", op, key));
        }
    }
}

#[async_trait]
impl KvTransport for RecordingTransport {
    async fn get(&self, key: &str) -> Result<Option<String>, TransportError> {
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), TransportError> {
        self.record("SET", key);
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, TransportError> {
        self.record("DEL", key);
        self.inner.delete(key).await
    }
}

/// Position of the first op equal to `op`.
pub fn position(ops: &[String], op: &str) -> Option<usize> {
    ops.iter().position(|o| o == op)
}

/// Position of the last op equal to `op`.
pub fn last_position(ops: &[String], op: &str) -> Option<usize> {
    ops.iter().rposition(|o| o == op)
}

// =============================================================================
// Test Application
// =============================================================================

#[cfg(feature = "server")]
#[allow(unused_imports)]
pub use app::TestApp;

#[cfg(feature = "server")]
mod app {
    use std::time::Duration;

    use axum_test::TestServer;
    use novel_cache::server::{AppState, router};
    use novel_cache::{CacheConfig, MemoryTransport};

    /// Router over an in-memory store, driven through axum-test.
    pub struct TestApp {
        pub server: TestServer,
        pub kv: MemoryTransport,
    }

    impl TestApp {
        /// Default cache settings.
        pub fn new() -> anyhow::Result<Self> {
            Self::with(MemoryTransport::new(), CacheConfig::default())
        }

        /// Small limits so short test values take the chunked path:
        /// values above 32 bytes are split into 32-byte chunks.
        pub fn chunking() -> anyhow::Result<Self> {
            let config = CacheConfig {
                max_value_bytes: 64,
                chunk_size: 32,
                ..CacheConfig::default()
            };
            Self::with(MemoryTransport::with_max_value_bytes(128), config)
        }

        pub fn with(kv: MemoryTransport, config: CacheConfig) -> anyhow::Result<Self> {
            let state = AppState::new(kv.clone(), config, Duration::from_secs(60));
            let server = TestServer::new(router(state))?;
            Ok(Self { server, kv })
        }
    }
}
