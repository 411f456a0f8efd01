use speciesml::{ModelError, TrainedModel};

use crate::types::{PenguinFeatures, PredictionResponse};

const RESPONSE_DECIMALS: i32 = 4;

pub fn predict_one(
    model: &TrainedModel,
    features: &PenguinFeatures,
) -> Result<PredictionResponse, ModelError> {
    let prediction = model.predict(&features.values())?;
    Ok(PredictionResponse {
        prediction: prediction.label,
        probabilities: prediction
            .probabilities
            .into_iter()
            .map(|(label, p)| (label, round(p, RESPONSE_DECIMALS)))
            .collect(),
    })
}

pub fn predict_many(
    model: &TrainedModel,
    records: &[PenguinFeatures],
) -> Result<Vec<PredictionResponse>, ModelError> {
    records.iter().map(|f| predict_one(model, f)).collect()
}

fn round(v: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (v * scale).round() / scale
}
