//! In-process transport with TTL expiry and an enforced value ceiling.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{KvTransport, TransportError};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

#[derive(Debug)]
struct Inner {
    entries: Mutex<HashMap<String, Entry>>,
    max_value_bytes: Option<usize>,
    available: AtomicBool,
    set_calls: AtomicU64,
}

/// KV store held in process memory.
///
/// Behaves like the remote store as far as the cache can tell: values expire
/// after their TTL and writes above the value ceiling are rejected. It can
/// be switched "down" to exercise the unavailable path. Clones share state.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::build(None)
    }
}

impl MemoryTransport {
    /// Unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects values larger than `limit` bytes.
    pub fn with_max_value_bytes(limit: usize) -> Self {
        Self::build(Some(limit))
    }

    fn build(max_value_bytes: Option<usize>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                max_value_bytes,
                available: AtomicBool::new(true),
                set_calls: AtomicU64::new(0),
            }),
        }
    }

    /// Make every subsequent call succeed (`true`) or fail with
    /// [`TransportError::Unavailable`] (`false`).
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Number of `set` calls attempted, including rejected ones.
    pub fn set_calls(&self) -> u64 {
        self.inner.set_calls.load(Ordering::SeqCst)
    }

    /// Live keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let entries = self.inner.entries.lock().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.is_live(now))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Whether `key` currently holds a live value.
    pub async fn contains(&self, key: &str) -> bool {
        let now = Instant::now();
        self.inner
            .entries
            .lock()
            .await
            .get(key)
            .is_some_and(|e| e.is_live(now))
    }

    fn check_available(&self) -> Result<(), TransportError> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Unavailable)
        }
    }
}

#[async_trait]
impl KvTransport for MemoryTransport {
    async fn get(&self, key: &str) -> Result<Option<String>, TransportError> {
        self.check_available()?;
        let now = Instant::now();
        let mut entries = self.inner.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), TransportError> {
        self.inner.set_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        if let Some(limit) = self.inner.max_value_bytes
            && value.len() > limit
        {
            return Err(TransportError::ValueTooLarge {
                key: key.to_string(),
                size: value.len(),
                limit,
            });
        }
        // A TTL past the clock's range never expires.
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        };
        self.inner.entries.lock().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, TransportError> {
        self.check_available()?;
        let now = Instant::now();
        let removed = self.inner.entries.lock().await.remove(key);
        Ok(removed.is_some_and(|e| e.is_live(now)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_delete() -> Result<(), TransportError> {
        let kv = MemoryTransport::new();
        kv.set("a", "1", None).await?;
        assert_eq!(kv.get("a").await?.as_deref(), Some("1"));
        assert!(kv.delete("a").await?);
        assert!(!kv.delete("a").await?);
        assert_eq!(kv.get("a").await?, None);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn values_expire_after_ttl() -> Result<(), TransportError> {
        let kv = MemoryTransport::new();
        kv.set("a", "1", Some(Duration::from_secs(10))).await?;
        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(kv.contains("a").await);
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(kv.get("a").await?, None);
        assert!(kv.keys().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn huge_ttl_never_expires() -> Result<(), TransportError> {
        let kv = MemoryTransport::new();
        kv.set("a", "1", Some(Duration::from_secs(u64::MAX))).await?;
        assert_eq!(kv.get("a").await?.as_deref(), Some("1"));
        Ok(())
    }

    #[tokio::test]
    async fn oversized_value_is_rejected() {
        let kv = MemoryTransport::with_max_value_bytes(4);
        let err = kv.set("a", "12345", None).await;
        assert!(matches!(
            err,
            Err(TransportError::ValueTooLarge { size: 5, limit: 4, .. })
        ));
        assert!(!kv.contains("a").await);
    }

    #[tokio::test]
    async fn unavailable_store_fails_and_counts_attempts() {
        let kv = MemoryTransport::new();
        kv.set_available(false);
        assert!(matches!(
            kv.set("a", "1", None).await,
            Err(TransportError::Unavailable)
        ));
        assert!(matches!(kv.get("a").await, Err(TransportError::Unavailable)));
        assert_eq!(kv.set_calls(), 1);
    }
}
