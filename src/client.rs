//! Shared handle to the transport and cache configuration.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::health;
use crate::logging::{trace, warn};
use crate::transport::KvTransport;

/// Transport plus configuration, cheap to clone.
///
/// Every store in the crate is built on one of these. The configuration is
/// fixed at construction.
#[derive(Clone)]
pub struct CacheClient {
    transport: Arc<dyn KvTransport>,
    config: Arc<CacheConfig>,
}

impl CacheClient {
    pub fn new(transport: impl KvTransport + 'static, config: CacheConfig) -> Self {
        Self::from_shared(Arc::new(transport), Arc::new(config))
    }

    pub fn from_shared(transport: Arc<dyn KvTransport>, config: Arc<CacheConfig>) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn transport(&self) -> &dyn KvTransport {
        self.transport.as_ref()
    }

    /// Run the health gate and report why it failed.
    pub async fn check_health(&self) -> Result<()> {
        health::probe(self.transport.as_ref(), &self.config).await
    }

    /// Run the health gate; a failure is logged and reported as `false`.
    pub async fn ensure_available(&self) -> bool {
        match self.check_health().await {
            Ok(()) => true,
            Err(CacheError::Disabled) => {
                trace!("cache disabled, skipping");
                false
            }
            Err(e) => {
                warn!(error = %e, "cache unavailable");
                false
            }
        }
    }

    pub(crate) async fn get_raw(&self, key: &str) -> Result<Option<String>> {
        Ok(self.transport.get(key).await?)
    }

    pub(crate) async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        Ok(self.transport.set(key, value, Some(ttl)).await?)
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn write_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_raw(key, &raw, ttl).await
    }

    /// Delete `keys` concurrently. Fails if any delete failed.
    pub(crate) async fn delete_many(&self, keys: &[String]) -> Result<()> {
        let results = join_all(keys.iter().map(|k| self.transport.delete(k))).await;
        let mut first_error = None;
        for (key, result) in keys.iter().zip(results) {
            if let Err(e) = result {
                warn!(key = %key, error = %e, "delete failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for CacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
