use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::{
    load_csv, stratified_split, DataInfo, Dataset, LabelEncoder, ModelInfo, SpeciesClassifier,
    TrainingInfo, MODEL_DESCRIPTION, MODEL_NAME,
};

pub const NEIGHBORS: usize = 11;
pub const SPLIT_SEED: u64 = 0;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid value {value:?} for {column} on line {line}")]
    InvalidValue { line: usize, column: String, value: String },

    #[error("Dataset has no usable rows")]
    EmptyDataset,

    #[error("Expected {expected} features, got {got}")]
    Dimension { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Outcome of one prediction: winning species plus the full probability vector
/// in encoder order.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub probabilities: Vec<(String, f64)>,
}

/// A trained classifier together with its encoder and metadata.
#[derive(Clone, Debug)]
pub struct TrainedModel {
    pub info: ModelInfo,
    pub classifier: SpeciesClassifier,
    pub encoder: LabelEncoder,
}

impl TrainedModel {
    pub fn predict(&self, features: &[f64]) -> Result<Prediction> {
        let proba = self.classifier.predict_proba(features)?;
        let best = self.classifier.predict(features)?;

        let label = self
            .encoder
            .inverse_transform(best)
            .ok_or(ModelError::Dimension { expected: self.encoder.classes().len(), got: best })?
            .to_string();
        let probabilities = self
            .encoder
            .classes()
            .iter()
            .cloned()
            .zip(proba)
            .collect();

        Ok(Prediction { label, probabilities })
    }
}

pub fn train_from_csv(path: &Path) -> Result<TrainedModel> {
    let dataset = load_csv(path)?;
    train_from_dataset(&dataset)
}

pub fn train_from_dataset(dataset: &Dataset) -> Result<TrainedModel> {
    if dataset.samples.is_empty() {
        return Err(ModelError::EmptyDataset);
    }

    let encoder = LabelEncoder::fit(dataset.samples.iter().map(|s| s.species.as_str()));
    let n_classes = encoder.classes().len();

    let x: Vec<Vec<f64>> = dataset.samples.iter().map(|s| s.features.clone()).collect();
    let y: Vec<usize> = dataset
        .samples
        .iter()
        .map(|s| encoder.transform(&s.species).unwrap_or_default())
        .collect();

    let (train_idx, test_idx) = stratified_split(&y, n_classes, SPLIT_SEED);
    let pick = |idx: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
        idx.iter().map(|&i| (x[i].clone(), y[i])).unzip()
    };
    let (x_train, y_train) = pick(&train_idx);
    let (x_test, y_test) = pick(&test_idx);

    let classifier = SpeciesClassifier::fit(&x_train, &y_train, n_classes, NEIGHBORS)?;
    let train_accuracy = round3(classifier.accuracy(&x_train, &y_train)?);
    let test_accuracy = round3(classifier.accuracy(&x_test, &y_test)?);

    let info = ModelInfo {
        name: MODEL_NAME.to_string(),
        description: MODEL_DESCRIPTION.to_string(),
        data_info: DataInfo {
            initial_rows: dataset.initial_rows,
            cleaned_rows: dataset.cleaned_rows(),
            dropped_rows: dataset.dropped_rows(),
        },
        training_info: TrainingInfo {
            train_accuracy,
            test_accuracy,
            label_mapping: encoder.mapping(),
        },
    };

    info!(
        rows_loaded = info.data_info.initial_rows,
        rows_after_clean = info.data_info.cleaned_rows,
        rows_dropped = info.data_info.dropped_rows,
        train_accuracy,
        test_accuracy,
        label_mapping = ?info.training_info.label_mapping,
        "model training completed"
    );

    Ok(TrainedModel { info, classifier, encoder })
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
