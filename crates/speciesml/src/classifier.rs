use std::collections::BTreeMap;

use crate::{ModelError, Result};

/// Maps species names to dense class indices (sorted, like the classic label encoder).
#[derive(Clone, Debug, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        let mut classes: Vec<String> = labels.into_iter().map(str::to_string).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn transform(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    pub fn inverse_transform(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn mapping(&self) -> BTreeMap<u32, String> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| (i as u32, c.clone()))
            .collect()
    }
}

/// Zero mean / unit variance scaling (population std, constant columns left unscaled).
#[derive(Clone, Debug)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(x: &[Vec<f64>]) -> Result<Self> {
        let first = x.first().ok_or(ModelError::EmptyDataset)?;
        let dims = first.len();
        let n = x.len() as f64;

        let mut mean = vec![0.0; dims];
        for row in x {
            check_dims(dims, row)?;
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / n;
            }
        }

        let mut scale = vec![0.0; dims];
        for row in x {
            for ((s, v), m) in scale.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2) / n;
            }
        }
        for s in scale.iter_mut() {
            *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
        }

        Ok(Self { mean, scale })
    }

    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>> {
        check_dims(self.mean.len(), row)?;
        Ok(row
            .iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }
}

/// Uniform-weight k-nearest-neighbours over euclidean distance.
#[derive(Clone, Debug)]
pub struct KNeighbors {
    k: usize,
    points: Vec<Vec<f64>>,
    targets: Vec<usize>,
    n_classes: usize,
}

impl KNeighbors {
    pub fn fit(
        k: usize,
        points: Vec<Vec<f64>>,
        targets: Vec<usize>,
        n_classes: usize,
    ) -> Result<Self> {
        if points.is_empty() || k == 0 {
            return Err(ModelError::EmptyDataset);
        }
        Ok(Self { k, points, targets, n_classes })
    }

    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut dist: Vec<(f64, usize)> = self
            .points
            .iter()
            .zip(&self.targets)
            .map(|(p, &t)| {
                let d: f64 = p.iter().zip(row).map(|(a, b)| (a - b).powi(2)).sum();
                (d, t)
            })
            .collect();
        // stable: ties keep training order
        dist.sort_by(|a, b| a.0.total_cmp(&b.0));

        let k = self.k.min(dist.len());
        let mut proba = vec![0.0; self.n_classes];
        for &(_, t) in &dist[..k] {
            proba[t] += 1.0 / k as f64;
        }
        proba
    }
}

/// Scaler + k-NN pipeline.
#[derive(Clone, Debug)]
pub struct SpeciesClassifier {
    scaler: StandardScaler,
    knn: KNeighbors,
}

impl SpeciesClassifier {
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, k: usize) -> Result<Self> {
        let scaler = StandardScaler::fit(x)?;
        let scaled = x.iter().map(|r| scaler.transform(r)).collect::<Result<Vec<_>>>()?;
        let knn = KNeighbors::fit(k, scaled, y.to_vec(), n_classes)?;
        Ok(Self { scaler, knn })
    }

    pub fn predict_proba(&self, row: &[f64]) -> Result<Vec<f64>> {
        let scaled = self.scaler.transform(row)?;
        Ok(self.knn.predict_proba(&scaled))
    }

    /// Most probable class; ties resolve to the lowest index.
    pub fn predict(&self, row: &[f64]) -> Result<usize> {
        Ok(argmax(&self.predict_proba(row)?))
    }

    pub fn accuracy(&self, x: &[Vec<f64>], y: &[usize]) -> Result<f64> {
        if x.is_empty() {
            return Ok(0.0);
        }
        let mut hits = 0usize;
        for (row, &target) in x.iter().zip(y) {
            if self.predict(row)? == target {
                hits += 1;
            }
        }
        Ok(hits as f64 / x.len() as f64)
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

fn check_dims(expected: usize, row: &[f64]) -> Result<()> {
    if row.len() != expected {
        return Err(ModelError::Dimension { expected, got: row.len() });
    }
    Ok(())
}
