use std::sync::Arc;

use crate::cache::{Cache, CacheStore};
use crate::lifecycle::ModelLifecycle;
use crate::model_info::ModelInfoCache;
use crate::persistence::{PredictionPersistence, StoragePaths};
use crate::remote::RemoteStore;
use crate::trainer::Trainer;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub lifecycle: Arc<ModelLifecycle>,
    pub model_info: ModelInfoCache,
    pub persistence: PredictionPersistence,
}

impl AppState {
    pub fn new(
        trainer: Box<dyn Trainer>,
        cache_store: Arc<dyn CacheStore>,
        remote: Arc<dyn RemoteStore>,
        paths: StoragePaths,
    ) -> Self {
        let lifecycle = Arc::new(ModelLifecycle::new(trainer));
        Self {
            model_info: ModelInfoCache::new(Cache::new(cache_store), lifecycle.clone()),
            persistence: PredictionPersistence::new(remote, lifecycle.clone(), paths),
            lifecycle,
        }
    }
}
