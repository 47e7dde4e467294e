//! KV transport: the async get/set/delete primitive the cache is built on.
//!
//! The remote store is reached through [`KvTransport`]. [`Transport`] is the
//! closed set of backends the binaries can be configured with, including an
//! explicit [`Transport::Unconfigured`] that fails every call instead of
//! pretending to be an empty store.

mod error;
#[cfg(feature = "http")]
mod http;
mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::config::TransportConfig;
use crate::logging::warn;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use memory::MemoryTransport;

/// Async access to a remote key-value store with a per-value size ceiling.
#[async_trait]
pub trait KvTransport: Send + Sync {
    /// Read a value. `Ok(None)` means the key does not exist (or expired).
    async fn get(&self, key: &str) -> Result<Option<String>, TransportError>;

    /// Write a value, optionally expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>)
    -> Result<(), TransportError>;

    /// Delete a key. Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, TransportError>;
}

/// Backend selected from configuration.
#[derive(Debug, Clone)]
pub enum Transport {
    /// REST command endpoint with bearer token auth.
    #[cfg(feature = "http")]
    Http(HttpTransport),
    /// In-process store.
    Memory(MemoryTransport),
    /// No backend configured; every call fails with
    /// [`TransportError::Unconfigured`].
    Unconfigured,
}

impl Transport {
    /// Build the backend described by `config`.
    ///
    /// A `rest` backend without both a URL and a token yields
    /// [`Transport::Unconfigured`] rather than an error, so the application
    /// keeps running against its backing store.
    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        match config.backend {
            crate::config::Backend::Memory => Ok(Self::Memory(match config.max_value_bytes {
                Some(limit) => MemoryTransport::with_max_value_bytes(limit),
                None => MemoryTransport::new(),
            })),
            crate::config::Backend::Rest => {
                let (Some(url), Some(token)) = (config.url.as_deref(), config.token.as_deref())
                else {
                    warn!("KV transport url or token missing, cache unavailable");
                    return Ok(Self::Unconfigured);
                };
                #[cfg(feature = "http")]
                {
                    Ok(Self::Http(HttpTransport::new(url, token, config.timeout())?))
                }
                #[cfg(not(feature = "http"))]
                {
                    let _ = (url, token);
                    warn!("built without the `http` feature, cache unavailable");
                    Ok(Self::Unconfigured)
                }
            }
        }
    }

    /// Returns `true` unless this is [`Transport::Unconfigured`].
    pub fn is_configured(&self) -> bool {
        !matches!(self, Self::Unconfigured)
    }
}

#[async_trait]
impl KvTransport for Transport {
    async fn get(&self, key: &str) -> Result<Option<String>, TransportError> {
        match self {
            #[cfg(feature = "http")]
            Self::Http(t) => t.get(key).await,
            Self::Memory(t) => t.get(key).await,
            Self::Unconfigured => Err(TransportError::Unconfigured),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), TransportError> {
        match self {
            #[cfg(feature = "http")]
            Self::Http(t) => t.set(key, value, ttl).await,
            Self::Memory(t) => t.set(key, value, ttl).await,
            Self::Unconfigured => Err(TransportError::Unconfigured),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, TransportError> {
        match self {
            #[cfg(feature = "http")]
            Self::Http(t) => t.delete(key).await,
            Self::Memory(t) => t.delete(key).await,
            Self::Unconfigured => Err(TransportError::Unconfigured),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Backend;

    #[tokio::test]
    async fn unconfigured_fails_every_call() {
        let transport = Transport::Unconfigured;
        assert!(!transport.is_configured());
        assert!(matches!(
            transport.get("k").await,
            Err(TransportError::Unconfigured)
        ));
        assert!(matches!(
            transport.set("k", "v", None).await,
            Err(TransportError::Unconfigured)
        ));
        assert!(matches!(
            transport.delete("k").await,
            Err(TransportError::Unconfigured)
        ));
    }

    #[test]
    fn rest_without_token_is_unconfigured() -> Result<(), TransportError> {
        let config = TransportConfig {
            backend: Backend::Rest,
            url: Some("https://kv.example.com".into()),
            token: None,
            ..TransportConfig::default()
        };
        assert!(!Transport::from_config(&config)?.is_configured());
        Ok(())
    }

    #[test]
    fn memory_backend_is_configured() -> Result<(), TransportError> {
        let config = TransportConfig {
            backend: Backend::Memory,
            ..TransportConfig::default()
        };
        assert!(matches!(
            Transport::from_config(&config)?,
            Transport::Memory(_)
        ));
        Ok(())
    }
}
