//! Category-sharded collection cache.
//!
//! A homogeneous list is cut into batches of `batch_size` items, each stored
//! as a JSON array at `prefix:chunk:i`, with `prefix:info` recording the
//! batch and item counts. Unlike blobs, reads degrade gracefully: a batch
//! that is missing or unparseable is skipped and the caller can compare the
//! item count against the info record.

use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::CacheClient;
use crate::error::{CacheError, Result};
use crate::logging::{debug, error, info, warn};
use crate::types::{CollectionInfo, WriteOutcome, chunk_key, info_key};

/// Items read back from a collection, with the info record they were
/// written under.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionSnapshot<T> {
    pub items: Vec<T>,
    pub info: CollectionInfo,
}

impl<T> CollectionSnapshot<T> {
    /// `true` when every item the info record promises was read.
    pub fn is_complete(&self) -> bool {
        self.items.len() as u64 == self.info.total_items
    }
}

/// Stores lists as item-count batches.
#[derive(Debug, Clone)]
pub struct CollectionCache {
    client: CacheClient,
}

impl CollectionCache {
    pub fn new(client: CacheClient) -> Self {
        Self { client }
    }

    /// Replace the collection under `prefix` with `items`.
    ///
    /// Existing batches are cleared first so a shorter list never inherits
    /// trailing batches from a longer one. Batches above the value ceiling
    /// are skipped and reported in [`WriteOutcome::Partial`].
    pub async fn set_collection<T: Serialize>(
        &self,
        prefix: &str,
        items: &[T],
        ttl: Duration,
    ) -> WriteOutcome {
        if !self.client.ensure_available().await {
            return WriteOutcome::Unavailable;
        }
        match self.try_set(prefix, items, ttl).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(prefix = %prefix, error = %e, "collection write failed");
                WriteOutcome::Failed
            }
        }
    }

    /// Read every item under `prefix` in insertion order.
    pub async fn get_collection<T: DeserializeOwned>(&self, prefix: &str) -> Option<Vec<T>> {
        self.get_collection_snapshot(prefix)
            .await
            .map(|snapshot| snapshot.items)
    }

    /// Read the collection along with its info record.
    pub async fn get_collection_snapshot<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Option<CollectionSnapshot<T>> {
        if !self.client.ensure_available().await {
            return None;
        }
        match self.try_get(prefix).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(prefix = %prefix, error = %e, "collection read failed");
                None
            }
        }
    }

    /// Delete every batch and the info record. Succeeds if nothing is cached.
    pub async fn clear_collection(&self, prefix: &str) -> bool {
        if !self.client.ensure_available().await {
            return false;
        }
        match self.try_clear(prefix).await {
            Ok(()) => true,
            Err(e) => {
                error!(prefix = %prefix, error = %e, "collection clear failed");
                false
            }
        }
    }

    async fn try_set<T: Serialize>(
        &self,
        prefix: &str,
        items: &[T],
        ttl: Duration,
    ) -> Result<WriteOutcome> {
        self.try_clear(prefix).await?;
        if items.is_empty() {
            debug!(prefix = %prefix, "empty collection, nothing to store");
            return Ok(WriteOutcome::Stored);
        }

        let config = self.client.config();
        let limit = config.max_value_bytes;
        let batches: Vec<&[T]> = items.chunks(config.effective_batch_size()).collect();
        let batch_count = u32::try_from(batches.len()).map_err(|_| CacheError::Oversize {
            key: prefix.to_string(),
            size: items.len(),
            limit: u32::MAX as usize,
        })?;

        let mut skipped = Vec::new();
        let mut pending = Vec::with_capacity(batches.len());
        for (i, batch) in (0..batch_count).zip(&batches) {
            let key = chunk_key(prefix, i);
            let raw = serde_json::to_string(batch)?;
            if raw.len() > limit {
                warn!(key = %key, bytes = raw.len(), limit, "batch too large, skipping");
                skipped.push(key);
                continue;
            }
            pending.push((key, raw));
        }

        let writes = pending
            .iter()
            .map(|(key, raw)| self.client.set_raw(key, raw, ttl));
        for ((key, _), result) in pending.iter().zip(join_all(writes).await) {
            if let Err(e) = result {
                warn!(key = %key, error = %e, "batch write failed");
                skipped.push(key.clone());
            }
        }

        if skipped.len() == batches.len() {
            error!(prefix = %prefix, "no batch could be written");
            return Ok(WriteOutcome::Failed);
        }

        let record = CollectionInfo {
            total_items: items.len() as u64,
            chunks: batch_count,
            updated_at: Utc::now(),
        };
        self.client.write_json(&info_key(prefix), &record, ttl).await?;

        debug!(
            prefix = %prefix,
            items = items.len(),
            batches = batch_count,
            skipped = skipped.len(),
            "stored collection"
        );
        if skipped.is_empty() {
            Ok(WriteOutcome::Stored)
        } else {
            Ok(WriteOutcome::Partial { skipped })
        }
    }

    async fn try_get<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<Option<CollectionSnapshot<T>>> {
        let Some(record) = self.read_info(prefix).await? else {
            debug!(prefix = %prefix, "collection miss");
            return Ok(None);
        };
        if record.chunks == 0 {
            return Ok(None);
        }

        let keys: Vec<String> = (0..record.chunks).map(|i| chunk_key(prefix, i)).collect();
        let results = join_all(keys.iter().map(|k| self.client.get_raw(k))).await;

        let mut items = Vec::new();
        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(Some(raw)) => match serde_json::from_str::<Vec<T>>(&raw) {
                    Ok(batch) => items.extend(batch),
                    Err(e) => {
                        warn!(key = %key, error = %e, "skipping unparseable batch");
                    }
                },
                Ok(None) => {
                    warn!(key = %key, "skipping missing batch");
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "skipping unreadable batch");
                }
            }
        }

        if items.is_empty() {
            warn!(prefix = %prefix, "no batch could be read");
            return Ok(None);
        }
        if items.len() as u64 != record.total_items {
            warn!(
                prefix = %prefix,
                read = items.len(),
                expected = record.total_items,
                "collection is incomplete"
            );
        }
        Ok(Some(CollectionSnapshot {
            items,
            info: record,
        }))
    }

    async fn try_clear(&self, prefix: &str) -> Result<()> {
        let mut keys = vec![info_key(prefix)];
        match self.read_info(prefix).await {
            Ok(Some(record)) => keys.extend((0..record.chunks).map(|i| chunk_key(prefix, i))),
            Ok(None) => return Ok(()),
            Err(CacheError::Corrupted { .. }) => {}
            Err(e) => return Err(e),
        }
        self.client.delete_many(&keys).await?;
        info!(prefix = %prefix, keys = keys.len(), "cleared collection");
        Ok(())
    }

    async fn read_info(&self, prefix: &str) -> Result<Option<CollectionInfo>> {
        let Some(raw) = self.client.get_raw(&info_key(prefix)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CacheError::corrupted(prefix, format!("unreadable info record: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::health::HEALTH_KEY;
    use crate::transport::{KvTransport, MemoryTransport};
    use serde::Deserialize;

    const TTL: Duration = Duration::from_secs(60);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Novel {
        id: u32,
        title: String,
    }

    fn novels(n: u32) -> Vec<Novel> {
        (0..n)
            .map(|id| Novel {
                id,
                title: format!("Novel {}", id),
            })
            .collect()
    }

    fn setup(batch_size: usize) -> (MemoryTransport, CollectionCache) {
        let kv = MemoryTransport::new();
        let config = CacheConfig {
            batch_size,
            ..CacheConfig::default()
        };
        let cache = CollectionCache::new(CacheClient::new(kv.clone(), config));
        (kv, cache)
    }

    async fn read_info(kv: &MemoryTransport, prefix: &str) -> anyhow::Result<CollectionInfo> {
        let raw = kv
            .get(&info_key(prefix))
            .await?
            .ok_or_else(|| anyhow::anyhow!("info record missing"))?;
        Ok(serde_json::from_str(&raw)?)
    }

    #[tokio::test]
    async fn forty_five_items_in_three_batches() -> anyhow::Result<()> {
        let (kv, cache) = setup(20);
        let items = novels(45);

        assert_eq!(cache.set_collection("novels_v2", &items, TTL).await, WriteOutcome::Stored);

        let record = read_info(&kv, "novels_v2").await?;
        assert_eq!(record.chunks, 3);
        assert_eq!(record.total_items, 45);

        let back: Option<Vec<Novel>> = cache.get_collection("novels_v2").await;
        assert_eq!(back, Some(items));
        Ok(())
    }

    #[tokio::test]
    async fn shrinking_leaves_no_trailing_batches() -> anyhow::Result<()> {
        let (kv, cache) = setup(20);
        cache.set_collection("novels_v2", &novels(45), TTL).await;
        cache.set_collection("novels_v2", &novels(10), TTL).await;

        assert!(kv.contains("novels_v2:chunk:0").await);
        assert!(!kv.contains("novels_v2:chunk:1").await);
        assert!(!kv.contains("novels_v2:chunk:2").await);
        assert_eq!(read_info(&kv, "novels_v2").await?.chunks, 1);

        let back: Option<Vec<Novel>> = cache.get_collection("novels_v2").await;
        assert_eq!(back, Some(novels(10)));
        Ok(())
    }

    #[tokio::test]
    async fn missing_batch_shortens_the_result() -> anyhow::Result<()> {
        let (kv, cache) = setup(20);
        cache.set_collection("novels_v2", &novels(45), TTL).await;
        kv.delete("novels_v2:chunk:1").await?;

        let snapshot = cache
            .get_collection_snapshot::<Novel>("novels_v2")
            .await
            .ok_or_else(|| anyhow::anyhow!("expected a partial collection"))?;
        assert!(!snapshot.is_complete());
        assert_eq!(snapshot.items.len(), 25);
        let ids: Vec<u32> = snapshot.items.iter().map(|n| n.id).collect();
        let expected: Vec<u32> = (0..20).chain(40..45).collect();
        assert_eq!(ids, expected);
        Ok(())
    }

    #[tokio::test]
    async fn unparseable_batch_is_skipped() -> anyhow::Result<()> {
        let (kv, cache) = setup(2);
        cache.set_collection("c", &novels(4), TTL).await;
        kv.set("c:chunk:0", "{broken", None).await?;

        let back: Option<Vec<Novel>> = cache.get_collection("c").await;
        assert_eq!(back.map(|v| v.len()), Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn every_batch_gone_is_a_miss() -> anyhow::Result<()> {
        let (kv, cache) = setup(5);
        cache.set_collection("c", &novels(5), TTL).await;
        kv.delete("c:chunk:0").await?;

        assert_eq!(cache.get_collection::<Novel>("c").await, None);
        Ok(())
    }

    #[tokio::test]
    async fn oversized_batch_is_skipped() {
        let kv = MemoryTransport::new();
        let config = CacheConfig {
            batch_size: 1,
            max_value_bytes: 64,
            ..CacheConfig::default()
        };
        let cache = CollectionCache::new(CacheClient::new(kv.clone(), config));
        let items = vec!["short".to_string(), "x".repeat(100), "also short".to_string()];

        let outcome = cache.set_collection("c", &items, TTL).await;
        assert_eq!(
            outcome,
            WriteOutcome::Partial {
                skipped: vec!["c:chunk:1".to_string()]
            }
        );
        let back: Option<Vec<String>> = cache.get_collection("c").await;
        assert_eq!(back, Some(vec!["short".to_string(), "also short".to_string()]));
    }

    #[tokio::test]
    async fn clear_removes_everything() {
        let (kv, cache) = setup(20);
        cache.set_collection("c", &novels(45), TTL).await;

        assert!(cache.clear_collection("c").await);
        let left: Vec<String> = kv
            .keys()
            .await
            .into_iter()
            .filter(|k| k != HEALTH_KEY)
            .collect();
        assert!(left.is_empty());
        assert!(cache.clear_collection("c").await);
    }

    #[tokio::test]
    async fn empty_collection_is_a_miss() {
        let (_kv, cache) = setup(20);
        let empty: Vec<Novel> = Vec::new();
        assert_eq!(cache.set_collection("c", &empty, TTL).await, WriteOutcome::Stored);
        assert_eq!(cache.get_collection::<Novel>("c").await, None);
    }

    #[tokio::test]
    async fn down_store_reads_as_miss() {
        let (kv, cache) = setup(20);
        cache.set_collection("c", &novels(3), TTL).await;
        kv.set_available(false);

        assert_eq!(cache.get_collection::<Novel>("c").await, None);
        assert_eq!(
            cache.set_collection("c", &novels(3), TTL).await,
            WriteOutcome::Unavailable
        );
    }
}
