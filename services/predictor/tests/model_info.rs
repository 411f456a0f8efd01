mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::StubTrainer;
use predictor::cache::{Cache, CacheStore, MemoryCacheStore};
use predictor::lifecycle::ModelLifecycle;
use predictor::model_info::{ModelInfoCache, MODEL_INFO_KEY, MODEL_INFO_TTL};
use speciesml::ModelInfo;

fn setup(trainer: StubTrainer) -> (ModelInfoCache, Arc<MemoryCacheStore>) {
    let store = Arc::new(MemoryCacheStore::new());
    let lifecycle = Arc::new(ModelLifecycle::new(Box::new(trainer)));
    (ModelInfoCache::new(Cache::new(store.clone()), lifecycle), store)
}

#[tokio::test(start_paused = true)]
async fn test_miss_populates_compressed_entry() {
    let (info_cache, store) = setup(StubTrainer::new());

    let info = info_cache.get_info().await.unwrap();
    assert_eq!(info.labels(), ["Adelie", "Chinstrap", "Gentoo"]);

    let raw = store.get(MODEL_INFO_KEY).await.unwrap().unwrap();
    assert!(raw.starts_with(&[0x1f, 0x8b]));
}

#[tokio::test(start_paused = true)]
async fn test_hit_returns_cached_value_until_expiry() {
    let trainer = StubTrainer::new();
    let calls = trainer.calls.clone();
    let (info_cache, store) = setup(trainer);
    let fresh = info_cache.get_info().await.unwrap();

    // Overwrite the entry so a hit is distinguishable from a recompute.
    let mut planted: ModelInfo = fresh.clone();
    planted.description = "planted".into();
    Cache::new(store.clone())
        .write_json(MODEL_INFO_KEY, &planted, true, Some(MODEL_INFO_TTL))
        .await
        .unwrap();

    tokio::time::advance(MODEL_INFO_TTL - Duration::from_secs(1)).await;
    assert_eq!(info_cache.get_info().await.unwrap().description, "planted");

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(info_cache.get_info().await.unwrap(), fresh);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invalidate_forces_recompute() {
    let (info_cache, store) = setup(StubTrainer::new());
    info_cache.get_info().await.unwrap();

    info_cache.invalidate().await.unwrap();
    assert!(store.get(MODEL_INFO_KEY).await.unwrap().is_none());

    info_cache.get_info().await.unwrap();
    assert!(store.get(MODEL_INFO_KEY).await.unwrap().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_load_failure_is_not_cached() {
    let (info_cache, store) = setup(StubTrainer::new().failing(1));

    assert!(info_cache.get_info().await.is_err());
    assert!(store.get(MODEL_INFO_KEY).await.unwrap().is_none());
    assert!(info_cache.get_info().await.is_ok());
}
