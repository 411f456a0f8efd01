use std::collections::HashSet;

use crate::{format_number, PredictionRow};

/// Fingerprint of a normalized row (timestamp excluded).
pub type RowKey = [u8; 32];

/// Reconciled row set: `existing` followed by the incoming rows it lacked.
#[derive(Clone, Debug, PartialEq)]
pub struct Reconciliation {
    pub rows: Vec<PredictionRow>,
    pub added: usize,
    pub duplicates: usize,
}

/// Trimmed text form of a cell. Numeric text is rewritten canonically so
/// `181`, `181.0` and ` 181.0 ` all normalize the same way.
pub fn normalize_cell(value: &str) -> String {
    let t = value.trim();
    match t.parse::<f64>() {
        Ok(v) if v.is_finite() => format_number(v),
        _ => t.to_string(),
    }
}

pub fn row_key(row: &PredictionRow) -> RowKey {
    let mut hasher = blake3::Hasher::new();
    let cells = row.cells();
    // last cell is the timestamp
    for cell in &cells[..cells.len() - 1] {
        hasher.update(normalize_cell(cell).as_bytes());
        hasher.update(b"\x1f");
    }
    hasher.finalize().into()
}

/// Appends to `existing` every incoming row whose normalized form it does not
/// already hold. `existing` is kept as is, duplicates inside it included;
/// incoming rows that repeat each other are appended once.
pub fn reconcile(existing: &[PredictionRow], incoming: &[PredictionRow]) -> Reconciliation {
    let mut seen: HashSet<RowKey> = existing.iter().map(row_key).collect();
    let mut rows = existing.to_vec();
    let mut duplicates = 0;

    for row in incoming {
        if seen.insert(row_key(row)) {
            rows.push(row.clone());
        } else {
            duplicates += 1;
        }
    }

    let added = rows.len() - existing.len();
    Reconciliation { rows, added, duplicates }
}
