//! Keyed-category cache.
//!
//! Small named sub-collections stored side by side under one prefix, each at
//! `prefix:category`, with `prefix:info` listing the populated categories.
//! Categories are written, read and expire independently; the info record is
//! merged on every write so siblings are never dropped from the index.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::CacheClient;
use crate::error::{CacheError, Result};
use crate::logging::{debug, error, info, warn};
use crate::types::{CategoryInfo, WriteOutcome, category_key, info_key};

/// Independently invalidatable named values under one prefix.
#[derive(Debug, Clone)]
pub struct CategoryCache {
    client: CacheClient,
}

impl CategoryCache {
    pub fn new(client: CacheClient) -> Self {
        Self { client }
    }

    /// Store one category and add it to the index.
    pub async fn set_category<T: Serialize>(
        &self,
        prefix: &str,
        category: &str,
        value: &T,
        ttl: Duration,
    ) -> WriteOutcome {
        self.set_entries(prefix, vec![(category, value)], ttl).await
    }

    /// Store several categories concurrently with a single index update.
    ///
    /// Categories that are too large or have a reserved name are skipped and
    /// named in [`WriteOutcome::Partial`]; siblings already cached are kept.
    pub async fn set_categories<T: Serialize>(
        &self,
        prefix: &str,
        values: &BTreeMap<String, T>,
        ttl: Duration,
    ) -> WriteOutcome {
        let entries = values.iter().map(|(k, v)| (k.as_str(), v)).collect();
        self.set_entries(prefix, entries, ttl).await
    }

    pub async fn get_category<T: DeserializeOwned>(
        &self,
        prefix: &str,
        category: &str,
    ) -> Option<T> {
        if !self.client.ensure_available().await {
            return None;
        }
        let key = category_key(prefix, category);
        match self.client.read_json(&key).await {
            Ok(value) => value,
            Err(e) => {
                warn!(key = %key, error = %e, "discarding unreadable category");
                None
            }
        }
    }

    /// Every indexed category that could be fetched and parsed.
    ///
    /// Returns `None`, not an empty map, when nothing usable came back.
    pub async fn get_all_categories<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Option<BTreeMap<String, T>> {
        if !self.client.ensure_available().await {
            return None;
        }
        match self.try_get_all(prefix).await {
            Ok(values) if values.is_empty() => {
                debug!(prefix = %prefix, "no categories cached");
                None
            }
            Ok(values) => Some(values),
            Err(e) => {
                warn!(prefix = %prefix, error = %e, "category read failed");
                None
            }
        }
    }

    /// Delete every indexed category, then the index.
    pub async fn invalidate_all(&self, prefix: &str) -> bool {
        if !self.client.ensure_available().await {
            return false;
        }
        match self.try_invalidate(prefix).await {
            Ok(()) => true,
            Err(e) => {
                error!(prefix = %prefix, error = %e, "category invalidation failed");
                false
            }
        }
    }

    /// Delete the named categories and drop them from the index, leaving
    /// their siblings in place. The index is removed once it lists nothing.
    pub async fn invalidate_categories(
        &self,
        prefix: &str,
        categories: &[&str],
        ttl: Duration,
    ) -> bool {
        if !self.client.ensure_available().await {
            return false;
        }
        match self.try_invalidate_some(prefix, categories, ttl).await {
            Ok(()) => true,
            Err(e) => {
                error!(prefix = %prefix, error = %e, "category invalidation failed");
                false
            }
        }
    }

    async fn set_entries<T: Serialize>(
        &self,
        prefix: &str,
        entries: Vec<(&str, &T)>,
        ttl: Duration,
    ) -> WriteOutcome {
        if !self.client.ensure_available().await {
            return WriteOutcome::Unavailable;
        }
        match self.try_set(prefix, entries, ttl).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(prefix = %prefix, error = %e, "category write failed");
                WriteOutcome::Failed
            }
        }
    }

    async fn try_set<T: Serialize>(
        &self,
        prefix: &str,
        entries: Vec<(&str, &T)>,
        ttl: Duration,
    ) -> Result<WriteOutcome> {
        if entries.is_empty() {
            return Ok(WriteOutcome::Stored);
        }

        let limit = self.client.config().max_value_bytes;
        let mut skipped = Vec::new();
        let mut pending = Vec::with_capacity(entries.len());
        for (category, value) in entries {
            if is_reserved(category) {
                warn!(prefix = %prefix, category = %category, "reserved category name, skipping");
                skipped.push(category.to_string());
                continue;
            }
            let raw = serde_json::to_string(value)?;
            if raw.len() > limit {
                warn!(
                    prefix = %prefix,
                    category = %category,
                    bytes = raw.len(),
                    limit,
                    "category too large, skipping"
                );
                skipped.push(category.to_string());
                continue;
            }
            pending.push((category, category_key(prefix, category), raw));
        }

        let writes = pending
            .iter()
            .map(|(_, key, raw)| self.client.set_raw(key, raw, ttl));
        let mut written = BTreeSet::new();
        for ((category, key, _), result) in pending.iter().zip(join_all(writes).await) {
            match result {
                Ok(()) => {
                    written.insert(category.to_string());
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "category write failed");
                    skipped.push(category.to_string());
                }
            }
        }

        if written.is_empty() {
            return Ok(WriteOutcome::Failed);
        }

        self.merge_index(prefix, &written, ttl).await?;
        debug!(prefix = %prefix, written = written.len(), skipped = skipped.len(), "stored categories");

        if skipped.is_empty() {
            Ok(WriteOutcome::Stored)
        } else {
            Ok(WriteOutcome::Partial { skipped })
        }
    }

    /// Read-merge-write of the index.
    async fn merge_index(
        &self,
        prefix: &str,
        written: &BTreeSet<String>,
        ttl: Duration,
    ) -> Result<()> {
        let mut categories = match self.read_index(prefix).await {
            Ok(Some(index)) => index.categories,
            Ok(None) => BTreeSet::new(),
            Err(CacheError::Corrupted { .. }) => {
                warn!(prefix = %prefix, "rebuilding unreadable category index");
                BTreeSet::new()
            }
            Err(e) => return Err(e),
        };
        categories.extend(written.iter().cloned());
        self.client
            .write_json(&info_key(prefix), &CategoryInfo::new(categories), ttl)
            .await
    }

    async fn try_get_all<T: DeserializeOwned>(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, T>> {
        let Some(index) = self.read_index(prefix).await? else {
            return Ok(BTreeMap::new());
        };

        let keys: Vec<String> = index
            .categories
            .iter()
            .map(|name| category_key(prefix, name))
            .collect();
        let results = join_all(keys.iter().map(|key| self.client.read_json::<T>(key))).await;

        let mut values = BTreeMap::new();
        for (name, result) in index.categories.iter().zip(results) {
            match result {
                Ok(Some(value)) => {
                    values.insert(name.clone(), value);
                }
                Ok(None) => {
                    debug!(prefix = %prefix, category = %name, "indexed category expired");
                }
                Err(e) => {
                    warn!(prefix = %prefix, category = %name, error = %e, "skipping category");
                }
            }
        }
        Ok(values)
    }

    async fn try_invalidate(&self, prefix: &str) -> Result<()> {
        let categories = match self.read_index(prefix).await {
            Ok(Some(index)) => index.categories,
            Ok(None) => return Ok(()),
            Err(CacheError::Corrupted { .. }) => BTreeSet::new(),
            Err(e) => return Err(e),
        };
        let keys: Vec<String> = categories
            .iter()
            .map(|c| category_key(prefix, c))
            .collect();
        self.client.delete_many(&keys).await?;
        self.client.transport().delete(&info_key(prefix)).await?;
        info!(prefix = %prefix, categories = keys.len(), "invalidated categories");
        Ok(())
    }

    async fn try_invalidate_some(
        &self,
        prefix: &str,
        categories: &[&str],
        ttl: Duration,
    ) -> Result<()> {
        let keys: Vec<String> = categories
            .iter()
            .filter(|c| !is_reserved(c))
            .map(|c| category_key(prefix, c))
            .collect();
        self.client.delete_many(&keys).await?;

        let remaining = match self.read_index(prefix).await {
            Ok(Some(index)) => index.categories,
            Ok(None) => return Ok(()),
            Err(CacheError::Corrupted { .. }) => {
                warn!(prefix = %prefix, "dropping unreadable category index");
                BTreeSet::new()
            }
            Err(e) => return Err(e),
        };
        let remaining: BTreeSet<String> = remaining
            .into_iter()
            .filter(|name| !categories.contains(&name.as_str()))
            .collect();

        if remaining.is_empty() {
            self.client.transport().delete(&info_key(prefix)).await?;
        } else {
            self.client
                .write_json(&info_key(prefix), &CategoryInfo::new(remaining), ttl)
                .await?;
        }
        info!(prefix = %prefix, categories = keys.len(), "invalidated categories");
        Ok(())
    }

    async fn read_index(&self, prefix: &str) -> Result<Option<CategoryInfo>> {
        let Some(raw) = self.client.get_raw(&info_key(prefix)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| CacheError::corrupted(prefix, format!("unreadable category index: {}", e)))
    }
}

/// Names that would alias the index or chunk keys under the same prefix.
fn is_reserved(category: &str) -> bool {
    category.is_empty() || category == "info" || category.starts_with("chunk:")
}
