use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use speciesml::TrainedModel;

/// Produces a trained model. Called once per lifecycle load.
#[async_trait]
pub trait Trainer: Send + Sync {
    async fn train(&self) -> anyhow::Result<TrainedModel>;
}

/// Trains the k-NN pipeline from the penguin csv on the blocking pool.
pub struct CsvTrainer {
    path: PathBuf,
}

impl CsvTrainer {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl Trainer for CsvTrainer {
    async fn train(&self) -> anyhow::Result<TrainedModel> {
        let path = self.path.clone();
        let model = tokio::task::spawn_blocking(move || speciesml::train_from_csv(&path))
            .await
            .context("training task aborted")?
            .with_context(|| format!("training from {} failed", self.path.display()))?;
        Ok(model)
    }
}
