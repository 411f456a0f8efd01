//! Appends predictions to the two remote audit files.
//!
//! Each sync attempt reads both files, unions them (csv rows first, then rows
//! only the workbook has), reconciles the new rows into that union and writes
//! the merged set back to whichever file differs from it. Writes are
//! conditional on the version read in the same attempt; a conflict restarts
//! the whole attempt. A file that was left behind by an earlier partial sync
//! is caught up by the next one.

use std::sync::Arc;

use predlog::{
    decode, encode, reconcile, ColumnLayout, Encoding, PredLogError, PredictionRecord,
    PredictionRow,
};
use speciesml::FEATURE_COLUMNS;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::lifecycle::{LoadError, ModelLifecycle};
use crate::remote::{ContentKind, RemoteError, RemoteStore};
use crate::types::{PenguinFeatures, PredictionResponse};

pub const MODEL_VERSION: &str = "v1.0";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const MAX_SYNC_ATTEMPTS: usize = 3;

#[derive(Clone, Debug)]
pub struct StoragePaths {
    pub rows: String,
    pub table: String,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("{features} feature rows but {predictions} predictions")]
    LengthMismatch { features: usize, predictions: usize },
    #[error(transparent)]
    Record(#[from] PredLogError),
}

/// How one file ended up after a sync attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileSync {
    Written,
    Unchanged,
    Conflict,
    Failed(String),
}

impl FileSync {
    pub fn is_synced(&self) -> bool {
        matches!(self, Self::Written | Self::Unchanged)
    }
}

#[derive(Clone, Debug)]
pub struct SyncReport {
    pub added: usize,
    pub duplicates: usize,
    pub rows_file: FileSync,
    pub table_file: FileSync,
    pub attempts: usize,
}

impl SyncReport {
    /// Both files hold the merged row set.
    pub fn success(&self) -> bool {
        self.rows_file.is_synced() && self.table_file.is_synced()
    }

    fn conflicted(&self) -> bool {
        self.rows_file == FileSync::Conflict || self.table_file == FileSync::Conflict
    }

    fn aborted(reason: String) -> Self {
        Self {
            added: 0,
            duplicates: 0,
            rows_file: FileSync::Failed(reason.clone()),
            table_file: FileSync::Failed(reason),
            attempts: 0,
        }
    }
}

struct Snapshot<'a> {
    path: &'a str,
    encoding: Encoding,
    version: Option<String>,
    rows: Vec<PredictionRow>,
}

pub struct PredictionPersistence {
    store: Arc<dyn RemoteStore>,
    lifecycle: Arc<ModelLifecycle>,
    paths: StoragePaths,
}

impl PredictionPersistence {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        lifecycle: Arc<ModelLifecycle>,
        paths: StoragePaths,
    ) -> Self {
        Self { store, lifecycle, paths }
    }

    /// Never fails past this point: every problem is logged and reported as
    /// `false`.
    pub async fn persist(
        &self,
        features: &[PenguinFeatures],
        predictions: &[PredictionResponse],
    ) -> bool {
        let (layout, rows) = match self.build_rows(features, predictions).await {
            Ok(built) => built,
            Err(e) => {
                error!(error = %e, "prediction persist: could not build rows");
                return false;
            }
        };
        self.sync(&layout, &rows).await.success()
    }

    pub async fn build_rows(
        &self,
        features: &[PenguinFeatures],
        predictions: &[PredictionResponse],
    ) -> Result<(ColumnLayout, Vec<PredictionRow>), PersistError> {
        if features.len() != predictions.len() {
            return Err(PersistError::LengthMismatch {
                features: features.len(),
                predictions: predictions.len(),
            });
        }

        let model = self.lifecycle.ensure_loaded().await?;
        let layout = ColumnLayout::new(
            FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            model.encoder.classes().to_vec(),
        );
        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();

        let rows = features
            .iter()
            .zip(predictions)
            .map(|(f, p)| {
                let record = PredictionRecord::new(
                    f.named(),
                    p.prediction.clone(),
                    p.probabilities.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                    MODEL_VERSION,
                    timestamp.clone(),
                );
                PredictionRow::from_record(&record, &layout)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok((layout, rows))
    }

    pub async fn sync(&self, layout: &ColumnLayout, incoming: &[PredictionRow]) -> SyncReport {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut report = self.sync_once(layout, incoming).await;
            report.attempts = attempt;

            if report.conflicted() && attempt < MAX_SYNC_ATTEMPTS {
                warn!(attempt, "prediction sync: version conflict, retrying");
                continue;
            }

            if report.success() {
                info!(
                    added = report.added,
                    duplicates = report.duplicates,
                    attempts = attempt,
                    "prediction sync complete"
                );
            } else {
                error!(
                    rows_file = ?report.rows_file,
                    table_file = ?report.table_file,
                    attempts = attempt,
                    "prediction sync incomplete"
                );
            }
            return report;
        }
    }

    async fn sync_once(&self, layout: &ColumnLayout, incoming: &[PredictionRow]) -> SyncReport {
        let rows_file = self.fetch(&self.paths.rows, Encoding::Csv, layout).await;
        let table_file = self.fetch(&self.paths.table, Encoding::Xlsx, layout).await;

        let (rows_file, table_file) = match (rows_file, table_file) {
            (Ok(r), Ok(t)) => (r, t),
            (Err(e), _) | (_, Err(e)) => return SyncReport::aborted(e),
        };

        let base = reconcile(&rows_file.rows, &table_file.rows).rows;
        let merged = reconcile(&base, incoming);

        let rows_outcome = self.write_if_changed(&rows_file, &merged.rows, layout).await;
        let table_outcome = self.write_if_changed(&table_file, &merged.rows, layout).await;

        SyncReport {
            added: merged.added,
            duplicates: merged.duplicates,
            rows_file: rows_outcome,
            table_file: table_outcome,
            attempts: 0,
        }
    }

    async fn fetch<'a>(
        &self,
        path: &'a str,
        encoding: Encoding,
        layout: &ColumnLayout,
    ) -> Result<Snapshot<'a>, String> {
        let file = self
            .store
            .read_current(path)
            .await
            .map_err(|e| format!("reading {path}: {e}"))?;

        let Some(file) = file else {
            return Ok(Snapshot { path, encoding, version: None, rows: Vec::new() });
        };

        let rows = if file.content.is_empty() {
            Vec::new()
        } else {
            decode(encoding, &file.content, layout).map_err(|e| format!("decoding {path}: {e}"))?
        };
        Ok(Snapshot { path, encoding, version: Some(file.version), rows })
    }

    async fn write_if_changed(
        &self,
        snap: &Snapshot<'_>,
        merged: &[PredictionRow],
        layout: &ColumnLayout,
    ) -> FileSync {
        let exists = snap.version.is_some();
        if snap.rows == merged && (exists || merged.is_empty()) {
            return FileSync::Unchanged;
        }

        let bytes = match encode(snap.encoding, merged, layout) {
            Ok(b) => b,
            Err(e) => return FileSync::Failed(format!("encoding {}: {e}", snap.path)),
        };
        let kind = match snap.encoding {
            Encoding::Csv => ContentKind::Text,
            Encoding::Xlsx => ContentKind::Binary,
        };

        match self
            .store
            .write_conditional(snap.path, &bytes, kind, snap.version.as_deref())
            .await
        {
            Ok(()) => {
                info!(
                    path = snap.path,
                    rows = merged.len(),
                    create = !exists,
                    "prediction file written"
                );
                FileSync::Written
            }
            Err(RemoteError::Conflict { .. }) => {
                warn!(
                    path = snap.path,
                    version = ?snap.version,
                    "prediction file changed since read"
                );
                FileSync::Conflict
            }
            Err(e) => {
                error!(path = snap.path, error = %e, "prediction file write failed");
                FileSync::Failed(e.to_string())
            }
        }
    }
}
