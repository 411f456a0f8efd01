//! Owns the trained model and guarantees a single training flight.
//!
//! `ensure_loaded` is the only way in: the first caller that finds no model
//! takes the load guard and trains; callers arriving meanwhile wait on the
//! guard and then read the result of that same flight, success or failure.
//! Each flight is numbered under the status lock, so a caller knows which
//! flight it joined: the running one if it saw `Loading`, otherwise the next.
//! A failed flight leaves the manager retryable. A flight whose future was
//! dropped (or whose trainer panicked) leaves `Loading` behind with nobody
//! holding the guard; the next guard holder treats that as unloaded.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use speciesml::{LabelEncoder, ModelInfo, SpeciesClassifier, TrainedModel};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::trainer::Trainer;

#[derive(Debug, Clone)]
pub enum LifecycleStatus {
    Unloaded,
    Loading { started_at: i64, attempt: u64 },
    Loaded { model: Arc<TrainedModel>, loaded_at: i64 },
    Failed { error: String, failed_at: i64, attempt: u64 },
}

#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("model training failed: {0}")]
    Training(String),
}

pub struct ModelLifecycle {
    trainer: Box<dyn Trainer>,
    status: RwLock<LifecycleStatus>,
    load_guard: Mutex<()>,
    attempts: AtomicU64,
}

impl ModelLifecycle {
    pub fn new(trainer: Box<dyn Trainer>) -> Self {
        Self {
            trainer,
            status: RwLock::new(LifecycleStatus::Unloaded),
            load_guard: Mutex::new(()),
            attempts: AtomicU64::new(0),
        }
    }

    pub async fn ensure_loaded(&self) -> Result<Arc<TrainedModel>, LoadError> {
        if let Some(model) = self.model() {
            return Ok(model);
        }

        let joined = self.flight_to_join();
        let _guard = self.load_guard.lock().await;

        // The flight we joined may have settled the question.
        let settled = {
            let status = self.read_status();
            match &*status {
                LifecycleStatus::Loaded { model, .. } => Some(Ok(model.clone())),
                LifecycleStatus::Failed { error, attempt, .. } if *attempt >= joined => {
                    Some(Err(LoadError::Training(error.clone())))
                }
                _ => None,
            }
        };
        if let Some(result) = settled {
            return result;
        }

        let attempt = {
            let mut status = self.write_status();
            let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
            *status = LifecycleStatus::Loading { started_at: now(), attempt };
            attempt
        };
        info!(attempt, "model lifecycle: training started");

        match self.trainer.train().await {
            Ok(model) => {
                let model = Arc::new(model);
                self.set_status(LifecycleStatus::Loaded {
                    model: model.clone(),
                    loaded_at: now(),
                });
                info!(
                    attempt,
                    test_accuracy = model.info.training_info.test_accuracy,
                    "model lifecycle: loaded"
                );
                Ok(model)
            }
            Err(e) => {
                let error = format!("{e:#}");
                self.set_status(LifecycleStatus::Failed {
                    error: error.clone(),
                    failed_at: now(),
                    attempt,
                });
                error!(attempt, error = %error, "model lifecycle: training failed");
                Err(LoadError::Training(error))
            }
        }
    }

    pub fn status(&self) -> LifecycleStatus {
        self.read_status().clone()
    }

    pub fn is_loaded(&self) -> bool {
        matches!(&*self.read_status(), LifecycleStatus::Loaded { .. })
    }

    pub fn model(&self) -> Option<Arc<TrainedModel>> {
        match &*self.read_status() {
            LifecycleStatus::Loaded { model, .. } => Some(model.clone()),
            _ => None,
        }
    }

    pub fn classifier(&self) -> Option<SpeciesClassifier> {
        self.model().map(|m| m.classifier.clone())
    }

    pub fn label_encoder(&self) -> Option<LabelEncoder> {
        self.model().map(|m| m.encoder.clone())
    }

    pub fn info(&self) -> Option<ModelInfo> {
        self.model().map(|m| m.info.clone())
    }

    /// Number of training runs started so far.
    pub fn training_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Number of the flight whose outcome this caller will accept: the one
    /// in progress, or the next one to start.
    fn flight_to_join(&self) -> u64 {
        let status = self.read_status();
        match &*status {
            LifecycleStatus::Loading { attempt, .. } => *attempt,
            _ => self.attempts.load(Ordering::Acquire) + 1,
        }
    }

    fn read_status(&self) -> RwLockReadGuard<'_, LifecycleStatus> {
        self.status.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_status(&self) -> RwLockWriteGuard<'_, LifecycleStatus> {
        self.status.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: LifecycleStatus) {
        *self.write_status() = status;
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
