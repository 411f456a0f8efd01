use std::collections::HashMap;
use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use rust_xlsxwriter::Workbook;

use crate::{format_number, ColumnLayout, PredLogError, PredictionRow, Result};

pub const SHEET_NAME: &str = "Predictions";
/// Synthetic 1-based row number leading every tabular row.
pub const ROW_NUMBER_COLUMN: &str = "id";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Comma separated, header row first.
    Csv,
    /// Single-sheet workbook with a leading row-number column.
    Xlsx,
}

pub fn encode(
    encoding: Encoding,
    rows: &[PredictionRow],
    layout: &ColumnLayout,
) -> Result<Vec<u8>> {
    match encoding {
        Encoding::Csv => encode_csv(rows, layout),
        Encoding::Xlsx => encode_xlsx(rows, layout),
    }
}

pub fn decode(
    encoding: Encoding,
    bytes: &[u8],
    layout: &ColumnLayout,
) -> Result<Vec<PredictionRow>> {
    match encoding {
        Encoding::Csv => decode_csv(bytes, layout),
        Encoding::Xlsx => decode_xlsx(bytes, layout),
    }
}

pub fn encode_csv(rows: &[PredictionRow], layout: &ColumnLayout) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(layout.headers())?;
    for row in rows.iter().filter(|r| !r.is_blank()) {
        wtr.write_record(row.cells().iter().map(|c| c.trim()))?;
    }
    wtr.into_inner().map_err(|e| PredLogError::Io(e.error().to_string()))
}

pub fn decode_csv(bytes: &[u8], layout: &ColumnLayout) -> Result<Vec<PredictionRow>> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = column_index(rdr.headers()?.iter().map(str::to_string));

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row = PredictionRow::from_columns(layout, |name| {
            headers.get(name).and_then(|&i| record.get(i))
        });
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

pub fn encode_xlsx(rows: &[PredictionRow], layout: &ColumnLayout) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    sheet.write_string(0, 0, ROW_NUMBER_COLUMN)?;
    for (c, header) in layout.headers().into_iter().enumerate() {
        sheet.write_string(0, (c + 1) as u16, header)?;
    }

    for (i, row) in rows.iter().filter(|r| !r.is_blank()).enumerate() {
        let r = (i + 1) as u32;
        sheet.write_number(r, 0, r as f64)?;
        for (c, cell) in row.cells().into_iter().enumerate() {
            let cell = cell.trim();
            if !cell.is_empty() {
                sheet.write_string(r, (c + 1) as u16, cell)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn decode_xlsx(bytes: &[u8], layout: &ColumnLayout) -> Result<Vec<PredictionRow>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let range = workbook.worksheet_range_at(0).ok_or(PredLogError::MissingSheet)??;

    let mut lines = range.rows();
    let Some(header_row) = lines.next() else {
        return Ok(Vec::new());
    };
    let headers = column_index(header_row.iter().map(cell_text));

    let mut rows = Vec::new();
    for line in lines {
        let cells: Vec<String> = line.iter().map(cell_text).collect();
        let row = PredictionRow::from_columns(layout, |name| {
            headers.get(name).and_then(|&i| cells.get(i)).map(String::as_str)
        });
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

fn column_index(headers: impl Iterator<Item = String>) -> HashMap<String, usize> {
    headers
        .enumerate()
        .map(|(i, h)| (h.trim().to_string(), i))
        .collect()
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => format_number(*f),
        Data::Int(i) => i.to_string(),
        other => other.to_string(),
    }
}
