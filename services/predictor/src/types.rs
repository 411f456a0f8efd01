use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use speciesml::FEATURE_COLUMNS;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PenguinFeatures {
    pub bill_length_mm: f64,
    pub flipper_length_mm: f64,
}

impl PenguinFeatures {
    /// Values in training column order.
    pub fn values(&self) -> Vec<f64> {
        vec![self.bill_length_mm, self.flipper_length_mm]
    }

    pub fn named(&self) -> Vec<(String, f64)> {
        FEATURE_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .zip(self.values())
            .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchRequest {
    pub records: Vec<PenguinFeatures>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: String,
    pub probabilities: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SinglePredictionResponse {
    #[serde(flatten)]
    pub result: PredictionResponse,
    pub persisted: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchPredictionResponse {
    pub results: Vec<PredictionResponse>,
    pub persisted: bool,
}

/// Envelope shared by every endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}
