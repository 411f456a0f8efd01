//! Prediction audit log.
//!
//! Fixed-layout prediction rows, timestamp-insensitive reconciliation of row
//! sets, and the two on-disk encodings (row-oriented csv, tabular xlsx).

mod dedup;
mod record;
mod tabular;

pub use dedup::{normalize_cell, reconcile, row_key, Reconciliation, RowKey};
pub use record::{
    format_number, ColumnLayout, PredictionRecord, PredictionRow, MODEL_VERSION_COLUMN,
    PREDICTION_COLUMN, PROBABILITY_DECIMALS, TIMESTAMP_COLUMN,
};
pub use tabular::{
    decode, decode_csv, decode_xlsx, encode, encode_csv, encode_xlsx, Encoding, ROW_NUMBER_COLUMN,
    SHEET_NAME,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredLogError {
    #[error("Feature columns {got:?} do not match layout {expected:?}")]
    FeatureMismatch { expected: Vec<String>, got: Vec<String> },

    #[error("Probability labels {got:?} do not match model labels {expected:?}")]
    LabelMismatch { expected: Vec<String>, got: Vec<String> },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(String),

    #[error("XLSX write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("XLSX read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    #[error("Workbook has no worksheet")]
    MissingSheet,
}

pub type Result<T> = std::result::Result<T, PredLogError>;
