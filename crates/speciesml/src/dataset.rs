use std::io::Read;
use std::path::Path;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{ModelError, Result};

pub const FEATURE_COLUMNS: [&str; 2] = ["bill_length_mm", "flipper_length_mm"];
pub const TARGET_COLUMN: &str = "species";

const TEST_FRACTION: f64 = 0.25;
const MISSING_MARKERS: [&str; 4] = ["", "NA", "NaN", "nan"];

#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub features: Vec<f64>, // ordered as FEATURE_COLUMNS
    pub species: String,
}

/// Cleaned training data plus the row count before cleaning.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub initial_rows: usize,
    pub samples: Vec<Sample>,
}

impl Dataset {
    pub fn cleaned_rows(&self) -> usize {
        self.samples.len()
    }

    pub fn dropped_rows(&self) -> usize {
        self.initial_rows - self.samples.len()
    }
}

pub fn load_csv(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path)
        .map_err(|e| ModelError::Io(format!("{}: {e}", path.display())))?;
    load_dataset(file)
}

/// Reads the penguin csv and drops every row with a missing value in any column.
pub fn load_dataset<R: Read>(reader: R) -> Result<Dataset> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| ModelError::MissingColumn(name.to_string()))
    };
    let feature_idx = FEATURE_COLUMNS
        .iter()
        .map(|&c| column(c))
        .collect::<Result<Vec<_>>>()?;
    let target_idx = column(TARGET_COLUMN)?;

    let mut initial_rows = 0;
    let mut samples = Vec::new();

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        initial_rows += 1;

        let complete = record.len() == headers.len()
            && record.iter().all(|v| !MISSING_MARKERS.contains(&v.trim()));
        if !complete {
            continue;
        }

        let mut features = Vec::with_capacity(feature_idx.len());
        for (&idx, name) in feature_idx.iter().zip(FEATURE_COLUMNS) {
            let raw = record[idx].trim();
            let value = raw.parse::<f64>().map_err(|_| ModelError::InvalidValue {
                line: i + 2,
                column: name.to_string(),
                value: raw.to_string(),
            })?;
            features.push(value);
        }

        samples.push(Sample {
            features,
            species: record[target_idx].trim().to_string(),
        });
    }

    Ok(Dataset { initial_rows, samples })
}

/// Stratified train/test split. Every class keeps at least one training row.
pub fn stratified_split(
    targets: &[usize],
    n_classes: usize,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for class in 0..n_classes {
        let mut members: Vec<usize> = targets
            .iter()
            .enumerate()
            .filter(|(_, &t)| t == class)
            .map(|(i, _)| i)
            .collect();
        members.shuffle(&mut rng);

        let n = members.len();
        let n_test = ((n as f64) * TEST_FRACTION).round() as usize;
        let n_test = n_test.min(n.saturating_sub(1));

        test.extend_from_slice(&members[..n_test]);
        train.extend_from_slice(&members[n_test..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}
