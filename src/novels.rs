//! Application-facing caches for the novel catalog and rankings.
//!
//! The host application calls these instead of the generic stores. Every
//! read returns `None` when the cache cannot answer, which the caller treats
//! as "fetch from the backing store".

use std::collections::BTreeMap;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::category::CategoryCache;
use crate::client::CacheClient;
use crate::collection::CollectionCache;
use crate::logging::{info, warn};
use crate::types::WriteOutcome;

/// Collection holding the full catalog.
pub const NOVELS_KEY: &str = "novels_v2";
/// Featured categories; also the legacy mirror of the rankings.
pub const FEATURED_KEY: &str = "featured_v2";
/// Ranking lists.
pub const RANKINGS_KEY: &str = "rankings_list_v1";

pub const NEW_RELEASES: &str = "newReleases";
pub const TRENDING: &str = "trending";
pub const POPULAR: &str = "popular";

const RANKING_CATEGORIES: [&str; 3] = [NEW_RELEASES, TRENDING, POPULAR];

/// The three ranking lists shown on the home page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rankings<T> {
    #[serde(default = "Vec::new")]
    pub new_releases: Vec<T>,
    #[serde(default = "Vec::new")]
    pub trending: Vec<T>,
    #[serde(default = "Vec::new")]
    pub popular: Vec<T>,
}

impl<T> Default for Rankings<T> {
    fn default() -> Self {
        Self {
            new_releases: Vec::new(),
            trending: Vec::new(),
            popular: Vec::new(),
        }
    }
}

impl<T> Rankings<T> {
    fn as_categories(&self) -> BTreeMap<String, &Vec<T>> {
        BTreeMap::from([
            (NEW_RELEASES.to_string(), &self.new_releases),
            (TRENDING.to_string(), &self.trending),
            (POPULAR.to_string(), &self.popular),
        ])
    }

    fn from_categories(mut categories: BTreeMap<String, Vec<T>>) -> Self {
        Self {
            new_releases: categories.remove(NEW_RELEASES).unwrap_or_default(),
            trending: categories.remove(TRENDING).unwrap_or_default(),
            popular: categories.remove(POPULAR).unwrap_or_default(),
        }
    }
}

/// Catalog, featured and ranking caches over one client.
#[derive(Debug, Clone)]
pub struct NovelCache {
    client: CacheClient,
    collections: CollectionCache,
    categories: CategoryCache,
}

impl NovelCache {
    pub fn new(client: CacheClient) -> Self {
        Self {
            collections: CollectionCache::new(client.clone()),
            categories: CategoryCache::new(client.clone()),
            client,
        }
    }

    /// Cache the whole catalog with the configured novel TTL.
    pub async fn set_novel_cache<T: Serialize>(&self, items: &[T]) -> WriteOutcome {
        let ttl = self.client.config().novel_ttl();
        self.set_novel_cache_with_ttl(items, ttl).await
    }

    pub async fn set_novel_cache_with_ttl<T: Serialize>(
        &self,
        items: &[T],
        ttl: Duration,
    ) -> WriteOutcome {
        self.collections.set_collection(NOVELS_KEY, items, ttl).await
    }

    /// The cached catalog, or `None` if it is absent or incomplete.
    pub async fn get_novel_cache<T: DeserializeOwned>(&self) -> Option<Vec<T>> {
        let snapshot = self.collections.get_collection_snapshot(NOVELS_KEY).await?;
        if !snapshot.is_complete() {
            warn!(
                read = snapshot.items.len(),
                expected = snapshot.info.total_items,
                "novel cache incomplete, refetch required"
            );
            return None;
        }
        Some(snapshot.items)
    }

    pub async fn invalidate_novel_cache(&self) -> bool {
        self.collections.clear_collection(NOVELS_KEY).await
    }

    /// Merge `featured` into the featured categories.
    pub async fn set_featured_novels_cache<T: Serialize>(
        &self,
        featured: &BTreeMap<String, Vec<T>>,
    ) -> WriteOutcome {
        let ttl = self.client.config().featured_ttl();
        self.categories
            .set_categories(FEATURED_KEY, featured, ttl)
            .await
    }

    pub async fn get_featured_novels_cache<T: DeserializeOwned>(
        &self,
    ) -> Option<BTreeMap<String, Vec<T>>> {
        self.categories.get_all_categories(FEATURED_KEY).await
    }

    pub async fn invalidate_featured_novels_cache(&self) -> bool {
        self.categories.invalidate_all(FEATURED_KEY).await
    }

    /// Store the rankings and mirror them into the legacy featured cache.
    ///
    /// The legacy cache is rebuilt first (read, invalidate, write merged)
    /// and the primary last, so an interrupted sequence leaves the primary
    /// no older than the legacy copy. The returned outcome is the primary's.
    pub async fn set_ranking_cache<T: Serialize>(&self, rankings: &Rankings<T>) -> WriteOutcome {
        let fresh = rankings.as_categories();

        let legacy = self.mirror_to_legacy(&fresh).await;
        if !legacy.is_success() {
            warn!(outcome = legacy.as_str(), "legacy ranking mirror not updated");
        }

        let ttl = self.client.config().ranking_ttl();
        self.categories
            .set_categories(RANKINGS_KEY, &fresh, ttl)
            .await
    }

    pub async fn get_ranking_cache<T: DeserializeOwned>(&self) -> Option<Rankings<T>> {
        self.categories
            .get_all_categories(RANKINGS_KEY)
            .await
            .map(Rankings::from_categories)
    }

    /// Drop the rankings and their legacy mirror. Featured categories the
    /// rankings do not own are kept.
    pub async fn invalidate_ranking_cache(&self) -> bool {
        let primary = self.categories.invalidate_all(RANKINGS_KEY).await;
        let ttl = self.client.config().featured_ttl();
        let legacy = self
            .categories
            .invalidate_categories(FEATURED_KEY, &RANKING_CATEGORIES, ttl)
            .await;
        info!(primary, legacy, "invalidated ranking cache");
        primary && legacy
    }

    async fn mirror_to_legacy<T: Serialize>(
        &self,
        fresh: &BTreeMap<String, &Vec<T>>,
    ) -> WriteOutcome {
        let mut merged: BTreeMap<String, Value> = self
            .categories
            .get_all_categories(FEATURED_KEY)
            .await
            .unwrap_or_default();

        if !self.categories.invalidate_all(FEATURED_KEY).await {
            return WriteOutcome::Failed;
        }

        for (category, items) in fresh {
            match serde_json::to_value(items) {
                Ok(value) => {
                    merged.insert(category.clone(), value);
                }
                Err(e) => {
                    warn!(category = %category, error = %e, "ranking not serializable");
                }
            }
        }

        let ttl = self.client.config().featured_ttl();
        self.categories
            .set_categories(FEATURED_KEY, &merged, ttl)
            .await
    }
}
