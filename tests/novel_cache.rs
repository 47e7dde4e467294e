//! End-to-end tests of the application-facing novel caches over the memory
//! transport.

mod common;

use std::collections::BTreeMap;

use common::{Novel, RecordingTransport, data_keys, last_position, memory_client, novels, position};
use novel_cache::novels::{FEATURED_KEY, NOVELS_KEY, RANKINGS_KEY};
use novel_cache::types::CollectionInfo;
use novel_cache::{
    CacheClient, CacheConfig, KvTransport, MemoryTransport, NovelCache, Rankings, WriteOutcome,
};

fn rankings(new_releases: usize, trending: usize, popular: usize) -> Rankings<Novel> {
    let all = novels(new_releases + trending + popular);
    let (new, rest) = all.split_at(new_releases);
    let (hot, top) = rest.split_at(trending);
    Rankings {
        new_releases: new.to_vec(),
        trending: hot.to_vec(),
        popular: top.to_vec(),
    }
}

// =============================================================================
// Novel Catalog
// =============================================================================

#[tokio::test]
async fn catalog_of_45_is_stored_in_3_batches() -> anyhow::Result<()> {
    let (kv, client) = memory_client();
    let cache = NovelCache::new(client);
    let catalog = novels(45);

    assert_eq!(cache.set_novel_cache(&catalog).await, WriteOutcome::Stored);

    let info: CollectionInfo =
        serde_json::from_str(&kv.get("novels_v2:info").await?.unwrap_or_default())?;
    assert_eq!(info.chunks, 3);
    assert_eq!(info.total_items, 45);
    assert_eq!(
        data_keys(&kv).await,
        vec![
            "novels_v2:chunk:0",
            "novels_v2:chunk:1",
            "novels_v2:chunk:2",
            "novels_v2:info"
        ]
    );

    let back: Option<Vec<Novel>> = cache.get_novel_cache().await;
    assert_eq!(back, Some(catalog));
    Ok(())
}

#[tokio::test]
async fn shrinking_catalog_leaves_no_stale_batches() -> anyhow::Result<()> {
    let (kv, client) = memory_client();
    let cache = NovelCache::new(client);

    cache.set_novel_cache(&novels(45)).await;
    cache.set_novel_cache(&novels(5)).await;

    assert!(!kv.contains("novels_v2:chunk:1").await);
    assert!(!kv.contains("novels_v2:chunk:2").await);
    let back: Option<Vec<Novel>> = cache.get_novel_cache().await;
    assert_eq!(back.map(|v| v.len()), Some(5));
    Ok(())
}

#[tokio::test]
async fn incomplete_catalog_is_a_miss() -> anyhow::Result<()> {
    let (kv, client) = memory_client();
    let cache = NovelCache::new(client);
    cache.set_novel_cache(&novels(45)).await;

    kv.delete("novels_v2:chunk:1").await?;

    let back: Option<Vec<Novel>> = cache.get_novel_cache().await;
    assert_eq!(back, None);
    Ok(())
}

#[tokio::test]
async fn down_store_skips_the_cache() {
    let kv = MemoryTransport::new();
    kv.set_available(false);
    let cache = NovelCache::new(CacheClient::new(kv.clone(), CacheConfig::default()));

    let back: Option<Vec<Novel>> = cache.get_novel_cache().await;
    assert_eq!(back, None);
    // Only the probe was attempted.
    assert_eq!(kv.set_calls(), 1);
}

#[tokio::test]
async fn disabled_cache_never_touches_the_store() {
    let kv = MemoryTransport::new();
    let config = CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    };
    let cache = NovelCache::new(CacheClient::new(kv.clone(), config));

    assert_eq!(cache.set_novel_cache(&novels(3)).await, WriteOutcome::Unavailable);
    assert_eq!(cache.get_novel_cache::<Novel>().await, None);
    assert_eq!(kv.set_calls(), 0);
}

#[tokio::test]
async fn invalidate_catalog() {
    let (kv, client) = memory_client();
    let cache = NovelCache::new(client);
    cache.set_novel_cache(&novels(30)).await;

    assert!(cache.invalidate_novel_cache().await);
    assert!(data_keys(&kv).await.is_empty());
    assert_eq!(cache.get_novel_cache::<Novel>().await, None);
}

// =============================================================================
// Featured Novels
// =============================================================================

#[tokio::test]
async fn featured_categories_merge() -> anyhow::Result<()> {
    let (_kv, client) = memory_client();
    let cache = NovelCache::new(client);

    let first = BTreeMap::from([("newReleases".to_string(), novels(5))]);
    let second = BTreeMap::from([("trending".to_string(), novels(5))]);
    assert!(cache.set_featured_novels_cache(&first).await.is_stored());
    assert!(cache.set_featured_novels_cache(&second).await.is_stored());

    let featured: BTreeMap<String, Vec<Novel>> = cache
        .get_featured_novels_cache()
        .await
        .ok_or_else(|| anyhow::anyhow!("featured cache should hit"))?;
    assert_eq!(
        featured.keys().map(String::as_str).collect::<Vec<_>>(),
        vec!["newReleases", "trending"]
    );
    assert_eq!(featured.get("trending").map(Vec::len), Some(5));
    Ok(())
}

#[tokio::test]
async fn invalidate_featured() {
    let (kv, client) = memory_client();
    let cache = NovelCache::new(client);
    let featured = BTreeMap::from([("editorsPick".to_string(), novels(2))]);
    cache.set_featured_novels_cache(&featured).await;

    assert!(cache.invalidate_featured_novels_cache().await);
    assert!(data_keys(&kv).await.is_empty());
}

// =============================================================================
// Rankings
// =============================================================================

#[tokio::test]
async fn rankings_round_trip() {
    let (_kv, client) = memory_client();
    let cache = NovelCache::new(client);
    let lists = rankings(3, 4, 5);

    assert!(cache.set_ranking_cache(&lists).await.is_stored());
    let back: Option<Rankings<Novel>> = cache.get_ranking_cache().await;
    assert_eq!(back, Some(lists));
}

#[tokio::test]
async fn missing_ranking_list_reads_empty() -> anyhow::Result<()> {
    let (kv, client) = memory_client();
    let cache = NovelCache::new(client);
    cache.set_ranking_cache(&rankings(2, 2, 2)).await;

    kv.delete(&format!("{}:popular", RANKINGS_KEY)).await?;

    let back: Option<Rankings<Novel>> = cache.get_ranking_cache().await;
    let back = back.ok_or_else(|| anyhow::anyhow!("rankings should hit"))?;
    assert_eq!(back.new_releases.len(), 2);
    assert!(back.popular.is_empty());
    Ok(())
}

#[tokio::test]
async fn rankings_are_mirrored_into_featured() {
    let (_kv, client) = memory_client();
    let cache = NovelCache::new(client);
    let editors = BTreeMap::from([("editorsPick".to_string(), novels(1))]);
    cache.set_featured_novels_cache(&editors).await;

    cache.set_ranking_cache(&rankings(1, 2, 3)).await;

    let featured: Option<BTreeMap<String, Vec<Novel>>> = cache.get_featured_novels_cache().await;
    let names: Vec<String> = featured
        .map(|f| f.into_keys().collect())
        .unwrap_or_default();
    assert_eq!(names, vec!["editorsPick", "newReleases", "popular", "trending"]);
}

#[tokio::test]
async fn legacy_mirror_is_rebuilt_before_primary() {
    let recorder = RecordingTransport::new(MemoryTransport::new());
    let cache = NovelCache::new(CacheClient::new(recorder.clone(), CacheConfig::default()));
    let editors = BTreeMap::from([("editorsPick".to_string(), novels(1))]);
    cache.set_featured_novels_cache(&editors).await;
    recorder.clear();

    cache.set_ranking_cache(&rankings(1, 1, 1)).await;
    let ops = recorder.ops();

    let legacy_info = format!("{}:info", FEATURED_KEY);
    let invalidated = position(&ops, &format!("DEL {}", legacy_info));
    let rebuilt = last_position(&ops, &format!("SET {}", legacy_info));
    let primary = ops
        .iter()
        .position(|op| op.starts_with(&format!("SET {}:", RANKINGS_KEY)));

    assert!(invalidated.is_some(), "legacy index deleted: {ops:?}");
    assert!(invalidated < rebuilt, "legacy rebuilt after invalidation: {ops:?}");
    assert!(rebuilt.is_some() && rebuilt < primary, "primary written last: {ops:?}");
}

#[tokio::test]
async fn invalidate_rankings_clears_both_caches() {
    let (kv, client) = memory_client();
    let cache = NovelCache::new(client);
    cache.set_ranking_cache(&rankings(2, 2, 2)).await;

    assert!(cache.invalidate_ranking_cache().await);
    assert!(data_keys(&kv).await.is_empty());
    assert_eq!(cache.get_ranking_cache::<Novel>().await, None);
    assert_eq!(cache.get_featured_novels_cache::<Novel>().await, None);
}

#[tokio::test]
async fn invalidate_rankings_keeps_other_featured_categories() -> anyhow::Result<()> {
    let (kv, client) = memory_client();
    let cache = NovelCache::new(client);
    let editors = BTreeMap::from([("editorsPick".to_string(), novels(2))]);
    cache.set_featured_novels_cache(&editors).await;
    cache.set_ranking_cache(&rankings(1, 1, 1)).await;

    assert!(cache.invalidate_ranking_cache().await);

    let featured: BTreeMap<String, Vec<Novel>> = cache
        .get_featured_novels_cache()
        .await
        .ok_or_else(|| anyhow::anyhow!("editors' pick should survive"))?;
    assert_eq!(featured, editors);
    assert!(!kv.contains(&format!("{}:trending", FEATURED_KEY)).await);
    assert_eq!(cache.get_ranking_cache::<Novel>().await, None);
    Ok(())
}

#[tokio::test]
async fn catalog_key_is_separate_from_featured() {
    let (kv, client) = memory_client();
    let cache = NovelCache::new(client);
    cache.set_novel_cache(&novels(1)).await;
    cache
        .set_featured_novels_cache(&BTreeMap::from([("trending".to_string(), novels(1))]))
        .await;

    assert!(cache.invalidate_featured_novels_cache().await);
    assert!(kv.contains(&format!("{}:info", NOVELS_KEY)).await);
}
