use std::sync::Arc;
use std::time::Duration;

use speciesml::ModelInfo;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{Cache, CacheError};
use crate::lifecycle::{LoadError, ModelLifecycle};

pub const MODEL_INFO_KEY: &str = "model:info";
pub const MODEL_INFO_TTL: Duration = Duration::from_secs(14_400);

#[derive(Debug, Error)]
pub enum InfoError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Read-through cache of the current model's metadata.
pub struct ModelInfoCache {
    cache: Cache,
    lifecycle: Arc<ModelLifecycle>,
}

impl ModelInfoCache {
    pub fn new(cache: Cache, lifecycle: Arc<ModelLifecycle>) -> Self {
        Self { cache, lifecycle }
    }

    pub async fn get_info(&self) -> Result<ModelInfo, InfoError> {
        if let Some(info) = self.cache.read_json::<ModelInfo>(MODEL_INFO_KEY).await? {
            debug!(key = MODEL_INFO_KEY, "model info cache hit");
            return Ok(info);
        }

        // Two concurrent misses both write; the content is identical.
        let model = self.lifecycle.ensure_loaded().await?;
        self.cache
            .write_json(MODEL_INFO_KEY, &model.info, true, Some(MODEL_INFO_TTL))
            .await?;
        info!(key = MODEL_INFO_KEY, ttl_secs = MODEL_INFO_TTL.as_secs(), "model info cached");
        Ok(model.info.clone())
    }

    pub async fn invalidate(&self) -> Result<(), CacheError> {
        self.cache.delete(MODEL_INFO_KEY).await
    }
}
