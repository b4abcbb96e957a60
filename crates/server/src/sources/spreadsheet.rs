//! CSV, TSV and Excel/ODS imports

use calamine::{open_workbook_auto, Reader};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use template::Record;

use crate::error::{AppError, AppResult};

/// How a spreadsheet file is read, picked from its extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadsheetKind {
    Delimited(u8),
    Workbook,
}

impl SpreadsheetKind {
    /// Kind and normalised extension of a file name
    pub fn from_file_name(name: &str) -> AppResult<(Self, String)> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        let kind = match extension.as_str() {
            "csv" | "txt" => SpreadsheetKind::Delimited(b','),
            "tsv" => SpreadsheetKind::Delimited(b'\t'),
            "xlsx" | "xlsm" | "xls" | "ods" => SpreadsheetKind::Workbook,
            _ => {
                return Err(AppError::Validation(format!(
                    "unsupported spreadsheet {name:?}: expected .csv, .txt, .tsv, .xlsx, .xls or .ods"
                )))
            }
        };
        Ok((kind, extension))
    }
}

/// A header row and the data rows below it
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    /// Build a sheet from raw cell rows
    ///
    /// Leading and fully blank rows are dropped, the first remaining row is
    /// the header, and every data row is padded or cut to the header width.
    pub fn from_rows(raw: Vec<Vec<String>>) -> AppResult<Self> {
        let mut rows = raw.into_iter().filter(|row| !is_blank(row));

        let header = rows
            .next()
            .ok_or_else(|| AppError::Validation("spreadsheet has no header row".to_string()))?;
        let columns = normalize_header(header);

        let width = columns.len();
        let rows = rows
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Ok(Self { columns, rows })
    }

    pub fn total_rows(&self) -> usize {
        self.rows.len()
    }

    /// Data rows as records keyed by column name
    pub fn records(&self) -> Vec<Record> {
        self.rows.iter().map(|row| self.record(row)).collect()
    }

    /// The first `n` rows as records
    pub fn preview(&self, n: usize) -> Vec<Record> {
        self.rows.iter().take(n).map(|row| self.record(row)).collect()
    }

    fn record(&self, row: &[String]) -> Record {
        self.columns
            .iter()
            .zip(row)
            .map(|(column, cell)| (column.clone(), Value::String(cell.clone())))
            .collect()
    }
}

fn is_blank(row: &[String]) -> bool {
    row.iter().all(|cell| cell.trim().is_empty())
}

fn normalize_header(header: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    header
        .into_iter()
        .enumerate()
        .map(|(idx, cell)| {
            let trimmed = cell.trim_start_matches('\u{feff}').trim();
            let base = if trimmed.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                trimmed.to_string()
            };

            let mut name = base.clone();
            let mut n = 2;
            while !seen.insert(name.to_lowercase()) {
                name = format!("{base}_{n}");
                n += 1;
            }
            name
        })
        .collect()
}

/// Read a stored spreadsheet
pub fn read_file(path: &Path) -> AppResult<Sheet> {
    let name = path.to_string_lossy();
    let (kind, _) = SpreadsheetKind::from_file_name(&name)?;
    let raw = match kind {
        SpreadsheetKind::Delimited(delimiter) => read_delimited(path, delimiter)?,
        SpreadsheetKind::Workbook => read_workbook(path)?,
    };
    Sheet::from_rows(raw)
}

fn read_delimited(path: &Path, delimiter: u8) -> AppResult<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }
    Ok(rows)
}

fn read_workbook(path: &Path) -> AppResult<Vec<Vec<String>>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::Validation("workbook has no worksheets".to_string()))??;

    Ok(range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect())
}
