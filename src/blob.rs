//! Generic chunked object store.
//!
//! One logical blob lives either in a single entry at `key` or, when its
//! serialized form is above the direct threshold, in `key:chunk:0..n` plus a
//! `key:info` record. Reads reassemble strictly: a missing chunk or a length
//! mismatch makes the whole value a miss.

use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::CacheClient;
use crate::codec;
use crate::error::{CacheError, Result};
use crate::logging::{debug, error, warn};
use crate::types::{BlobValue, ChunkInfo, WriteOutcome, chunk_key, info_key};

/// Stores whole values across as many physical keys as they need.
#[derive(Debug, Clone)]
pub struct BlobStore {
    client: CacheClient,
}

impl BlobStore {
    pub fn new(client: CacheClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &CacheClient {
        &self.client
    }

    /// Store `value` under `key`, chunking it if needed.
    ///
    /// A previous representation of the key (direct or chunked) is removed
    /// first, so a read never mixes old and new pieces.
    pub async fn set_blob(&self, key: &str, value: &BlobValue, ttl: Duration) -> WriteOutcome {
        if !self.client.ensure_available().await {
            return WriteOutcome::Unavailable;
        }
        match self.try_set(key, value, ttl).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(key = %key, error = %e, "blob write failed");
                WriteOutcome::Failed
            }
        }
    }

    /// Read the value under `key`. Any inconsistency reads as a miss.
    pub async fn get_blob(&self, key: &str) -> Option<BlobValue> {
        match self.read_blob(key).await {
            Ok(value) => value,
            Err(CacheError::Disabled) => None,
            Err(e) => {
                error!(key = %key, error = %e, "blob read failed");
                None
            }
        }
    }

    /// Like [`get_blob`](Self::get_blob), but a failed health gate or
    /// transport error is returned instead of folded into a miss.
    ///
    /// Corruption is still a miss.
    pub async fn read_blob(&self, key: &str) -> Result<Option<BlobValue>> {
        self.client.check_health().await?;
        match self.try_get(key).await {
            Err(e @ CacheError::Corrupted { .. }) => {
                warn!(key = %key, error = %e, "discarding corrupted blob");
                Ok(None)
            }
            other => other,
        }
    }

    /// Remove the value under `key` and every chunk it owns.
    pub async fn delete_blob(&self, key: &str) -> bool {
        if !self.client.ensure_available().await {
            return false;
        }
        match self.try_delete(key).await {
            Ok(()) => true,
            Err(e) => {
                error!(key = %key, error = %e, "blob delete failed");
                false
            }
        }
    }

    /// Serialize `value` as JSON and store it.
    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> WriteOutcome {
        match serde_json::to_value(value) {
            Ok(json) => self.set_blob(key, &BlobValue::Json(json), ttl).await,
            Err(e) => {
                error!(key = %key, error = %e, "value is not serializable");
                WriteOutcome::Failed
            }
        }
    }

    /// Read a JSON value and deserialize it into `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_blob(key).await?.into_json();
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                warn!(key = %key, error = %e, "cached value has unexpected shape");
                None
            }
        }
    }

    async fn try_set(&self, key: &str, value: &BlobValue, ttl: Duration) -> Result<WriteOutcome> {
        let raw = value.encode()?;
        let config = self.client.config();

        if raw.len() <= config.effective_direct_threshold() {
            self.purge_chunks(key).await?;
            self.client.set_raw(key, &raw, ttl).await?;
            debug!(key = %key, bytes = raw.len(), "stored blob directly");
            return Ok(WriteOutcome::Stored);
        }

        let pieces = codec::split_str(&raw, config.effective_chunk_size())?;
        let count = u32::try_from(pieces.len()).map_err(|_| CacheError::Oversize {
            key: key.to_string(),
            size: raw.len(),
            limit: config
                .effective_chunk_size()
                .saturating_mul(u32::MAX as usize),
        })?;

        self.purge_chunks(key).await?;
        self.client.transport().delete(key).await?;

        let writes = (0..count).zip(&pieces).map(|(i, piece)| async move {
            let chunk = chunk_key(key, i);
            (i, self.client.set_raw(&chunk, piece, ttl).await)
        });
        let mut failed = 0usize;
        for (i, result) in join_all(writes).await {
            if let Err(e) = result {
                warn!(key = %key, chunk = i, error = %e, "chunk write failed");
                failed += 1;
            }
        }
        if failed > 0 {
            error!(key = %key, failed, total = count, "blob left incomplete");
            return Ok(WriteOutcome::Failed);
        }

        // The info record goes last: until it exists readers see a miss.
        let info = ChunkInfo::new(count, raw.len() as u64);
        self.client.write_json(&info_key(key), &info, ttl).await?;
        debug!(key = %key, bytes = raw.len(), chunks = count, "stored chunked blob");
        Ok(WriteOutcome::Stored)
    }

    async fn try_get(&self, key: &str) -> Result<Option<BlobValue>> {
        let raw = match self.read_info(key).await? {
            Some(info) => self.reassemble(key, &info).await?,
            None => self.client.get_raw(key).await?,
        };
        match raw {
            Some(raw) => Ok(Some(BlobValue::decode(raw))),
            None => {
                debug!(key = %key, "blob miss");
                Ok(None)
            }
        }
    }

    async fn try_delete(&self, key: &str) -> Result<()> {
        self.purge_chunks(key).await?;
        self.client.transport().delete(key).await?;
        Ok(())
    }

    async fn read_info(&self, key: &str) -> Result<Option<ChunkInfo>> {
        let Some(raw) = self.client.get_raw(&info_key(key)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CacheError::corrupted(key, format!("unreadable info record: {}", e)))
    }

    async fn reassemble(&self, key: &str, info: &ChunkInfo) -> Result<Option<String>> {
        if info.chunk_count == 0 {
            return Ok(None);
        }

        let keys: Vec<String> = (0..info.chunk_count).map(|i| chunk_key(key, i)).collect();
        let results = join_all(keys.iter().map(|k| self.client.get_raw(k))).await;

        let mut chunks = Vec::with_capacity(keys.len());
        for (i, result) in results.into_iter().enumerate() {
            match result? {
                Some(chunk) => chunks.push(chunk),
                None => {
                    return Err(CacheError::corrupted(
                        key,
                        format!("chunk {} of {} missing", i, info.chunk_count),
                    ));
                }
            }
        }

        let raw = codec::join_str(&chunks);
        if raw.len() as u64 != info.total_length {
            return Err(CacheError::corrupted(
                key,
                format!(
                    "reassembled {} bytes, info says {}",
                    raw.len(),
                    info.total_length
                ),
            ));
        }
        Ok(Some(raw))
    }

    /// Delete the info record and every chunk it names.
    async fn purge_chunks(&self, key: &str) -> Result<()> {
        let mut keys = vec![info_key(key)];
        match self.read_info(key).await {
            Ok(Some(info)) => keys.extend((0..info.chunk_count).map(|i| chunk_key(key, i))),
            Ok(None) => return Ok(()),
            // Unreadable info: drop it; its chunks expire with their TTL.
            Err(CacheError::Corrupted { .. }) => {}
            Err(e) => return Err(e),
        }
        self.client.delete_many(&keys).await
    }
}
