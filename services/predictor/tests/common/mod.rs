#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use predictor::persistence::StoragePaths;
use predictor::trainer::Trainer;
use predictor::types::{PenguinFeatures, PredictionResponse};
use speciesml::{train_from_dataset, Dataset, Sample, TrainedModel};

pub const ROWS_PATH: &str = "Github_Prediction_Storage/predictions.csv";
pub const TABLE_PATH: &str = "Github_Prediction_Storage/predictions.xlsx";

pub const HEADER: &str =
    "bill_length_mm,flipper_length_mm,prediction,Adelie,Chinstrap,Gentoo,model_version,prediction_timestamp";

pub fn paths() -> StoragePaths {
    StoragePaths {
        rows: ROWS_PATH.to_string(),
        table: TABLE_PATH.to_string(),
    }
}

/// Three well separated clusters, twelve birds each.
pub fn model() -> TrainedModel {
    let mut samples = Vec::new();
    for i in 0..12 {
        let d = i as f64 * 0.1;
        samples.push(Sample { features: vec![38.0 + d, 185.0 + d], species: "Adelie".into() });
        samples.push(Sample { features: vec![48.0 + d, 195.0 + d], species: "Chinstrap".into() });
        samples.push(Sample { features: vec![47.0 + d, 217.0 + d], species: "Gentoo".into() });
    }
    train_from_dataset(&Dataset { initial_rows: 36, samples }).unwrap()
}

/// Counts calls, sleeps for `delay`, fails the first `failures` calls.
pub struct StubTrainer {
    pub calls: Arc<AtomicUsize>,
    delay: Duration,
    failures: usize,
}

impl StubTrainer {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            delay: Duration::from_millis(50),
            failures: 0,
        }
    }

    pub fn failing(mut self, failures: usize) -> Self {
        self.failures = failures;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl Trainer for StubTrainer {
    async fn train(&self) -> anyhow::Result<TrainedModel> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        if n <= self.failures {
            anyhow::bail!("penguins.csv unreadable (call {n})");
        }
        Ok(model())
    }
}

pub fn features(bill: f64, flipper: f64) -> PenguinFeatures {
    PenguinFeatures {
        bill_length_mm: bill,
        flipper_length_mm: flipper,
    }
}

pub fn prediction(label: &str, probabilities: &[(&str, f64)]) -> PredictionResponse {
    PredictionResponse {
        prediction: label.to_string(),
        probabilities: probabilities
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<BTreeMap<_, _>>(),
    }
}
