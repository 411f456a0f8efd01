use crate::{PredLogError, Result};

pub const PREDICTION_COLUMN: &str = "prediction";
pub const MODEL_VERSION_COLUMN: &str = "model_version";
pub const TIMESTAMP_COLUMN: &str = "prediction_timestamp";

/// Probabilities are stored rounded to this many decimals.
pub const PROBABILITY_DECIMALS: i32 = 2;

/// One prediction as produced by the model. Immutable once created.
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionRecord {
    features: Vec<(String, f64)>,
    predicted_label: String,
    probabilities: Vec<(String, f64)>,
    model_version: String,
    timestamp: String,
}

impl PredictionRecord {
    pub fn new(
        features: Vec<(String, f64)>,
        predicted_label: impl Into<String>,
        probabilities: Vec<(String, f64)>,
        model_version: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            features,
            predicted_label: predicted_label.into(),
            probabilities,
            model_version: model_version.into(),
            timestamp: timestamp.into(),
        }
    }

    pub fn features(&self) -> &[(String, f64)] {
        &self.features
    }

    pub fn predicted_label(&self) -> &str {
        &self.predicted_label
    }

    pub fn probabilities(&self) -> &[(String, f64)] {
        &self.probabilities
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }
}

/// Column order shared by both persisted representations:
/// features, prediction, one column per label, model version, timestamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnLayout {
    features: Vec<String>,
    labels: Vec<String>,
}

impl ColumnLayout {
    pub fn new(features: Vec<String>, labels: Vec<String>) -> Self {
        Self { features, labels }
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn headers(&self) -> Vec<&str> {
        let mut h: Vec<&str> = self.features.iter().map(String::as_str).collect();
        h.push(PREDICTION_COLUMN);
        h.extend(self.labels.iter().map(String::as_str));
        h.push(MODEL_VERSION_COLUMN);
        h.push(TIMESTAMP_COLUMN);
        h
    }
}

/// A persisted prediction row in layout order. Cells are kept in their
/// rendered text form so rows read back from storage compare exactly.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PredictionRow {
    pub features: Vec<String>,
    pub prediction: String,
    pub probabilities: Vec<String>,
    pub model_version: String,
    pub prediction_timestamp: String,
}

impl PredictionRow {
    /// Renders a record against `layout`. The record must name exactly the
    /// layout's features and carry a probability for every label.
    pub fn from_record(record: &PredictionRecord, layout: &ColumnLayout) -> Result<Self> {
        let features = ordered_cells(&record.features, &layout.features, |v| format_number(*v))
            .ok_or_else(|| PredLogError::FeatureMismatch {
                expected: layout.features.clone(),
                got: record.features.iter().map(|(k, _)| k.clone()).collect(),
            })?;
        let probabilities = ordered_cells(&record.probabilities, &layout.labels, |v| {
            format_number(round_to(*v, PROBABILITY_DECIMALS))
        })
        .ok_or_else(|| PredLogError::LabelMismatch {
            expected: layout.labels.clone(),
            got: record.probabilities.iter().map(|(k, _)| k.clone()).collect(),
        })?;

        Ok(Self {
            features,
            prediction: record.predicted_label.clone(),
            probabilities,
            model_version: record.model_version.clone(),
            prediction_timestamp: record.timestamp.clone(),
        })
    }

    /// Builds a row from named cells read at the storage boundary.
    /// Cells are trimmed; columns the source does not have become empty cells.
    pub fn from_columns<'a>(
        layout: &ColumnLayout,
        lookup: impl Fn(&str) -> Option<&'a str>,
    ) -> Self {
        let cell = |name: &str| lookup(name).unwrap_or_default().trim().to_string();
        Self {
            features: layout.features.iter().map(|f| cell(f.as_str())).collect(),
            prediction: cell(PREDICTION_COLUMN),
            probabilities: layout.labels.iter().map(|l| cell(l.as_str())).collect(),
            model_version: cell(MODEL_VERSION_COLUMN),
            prediction_timestamp: cell(TIMESTAMP_COLUMN),
        }
    }

    /// Cells in `ColumnLayout::headers` order.
    pub fn cells(&self) -> Vec<&str> {
        let mut c: Vec<&str> = self.features.iter().map(String::as_str).collect();
        c.push(&self.prediction);
        c.extend(self.probabilities.iter().map(String::as_str));
        c.push(&self.model_version);
        c.push(&self.prediction_timestamp);
        c
    }

    pub fn is_blank(&self) -> bool {
        self.cells().iter().all(|c| c.trim().is_empty())
    }
}

/// Canonical text for a float: shortest round-trip form, integral values keep `.0`.
pub fn format_number(v: f64) -> String {
    format!("{v:?}")
}

fn round_to(v: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (v * f).round() / f
}

fn ordered_cells(
    named: &[(String, f64)],
    order: &[String],
    render: impl Fn(&f64) -> String,
) -> Option<Vec<String>> {
    if named.len() != order.len() {
        return None;
    }
    order
        .iter()
        .map(|name| named.iter().find(|(k, _)| k == name).map(|(_, v)| render(v)))
        .collect()
}
