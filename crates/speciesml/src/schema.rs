use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const MODEL_NAME: &str = "Penguins Prediction";
pub const MODEL_DESCRIPTION: &str = "Predict penguin species based on bill length and flipper length.";

/// Row accounting for the training csv.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataInfo {
    pub initial_rows: usize,
    pub cleaned_rows: usize,
    pub dropped_rows: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingInfo {
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub label_mapping: BTreeMap<u32, String>, // encoded class index -> species
}

/// Metadata describing one trained model. Replaced wholesale on reload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub description: String,
    pub data_info: DataInfo,
    pub training_info: TrainingInfo,
}

impl ModelInfo {
    /// Species labels in encoder order.
    pub fn labels(&self) -> Vec<String> {
        self.training_info.label_mapping.values().cloned().collect()
    }
}
