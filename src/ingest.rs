//! CSV ingestion into an untyped [`RawTable`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use crate::error::{RideError, Result};
use crate::model::{CellKey, Field};

/// Cell values read as missing.
pub const NA_TOKENS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A header plus rows of optional text cells. No invariants beyond every
/// row having one cell per header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Option<String>>>) -> Self {
        Self { headers, rows }
    }

    /// Builds a table from string literals; empty strings and NA tokens become missing.
    pub fn from_strs(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| to_cell(cell)).collect())
                .collect(),
        }
    }

    /// Reads a CSV stream with a mandatory header row.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if i == 0 {
                    h.trim_start_matches('\u{feff}').to_string()
                } else {
                    h.to_string()
                }
            })
            .collect();

        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(RideError::MissingHeader);
        }

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result?;
            if record.len() > headers.len() {
                return Err(RideError::RaggedRow {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    expected: headers.len(),
                    found: record.len(),
                });
            }
            let mut row: Vec<Option<String>> = record.iter().map(to_cell).collect();
            row.resize(headers.len(), None);
            rows.push(row);
        }

        debug!(columns = headers.len(), rows = rows.len(), "CSV ingested");
        Ok(Self { headers, rows })
    }

    /// Opens and reads a CSV file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| RideError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of the first column with this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Drops exact-duplicate rows, keeping the first occurrence. Numeric
    /// ride columns compare by value, everything else by text.
    pub fn dedupe(&mut self) -> usize {
        let numeric: Vec<bool> = self
            .headers
            .iter()
            .map(|h| Field::from_name(h).is_some_and(Field::is_numeric))
            .collect();

        let before = self.rows.len();
        let mut seen = std::collections::HashSet::new();
        self.rows.retain(|row| {
            let key: Vec<CellKey> = row
                .iter()
                .zip(&numeric)
                .map(|(cell, &is_num)| match cell {
                    Some(text) if is_num => match parse_number(text) {
                        Some(v) => CellKey::number(Some(v)),
                        None => CellKey::text(Some(text)),
                    },
                    other => CellKey::text(other.as_deref()),
                })
                .collect();
            seen.insert(key)
        });
        before - self.rows.len()
    }
}

fn to_cell(value: &str) -> Option<String> {
    if NA_TOKENS.contains(&value) {
        None
    } else {
        Some(value.to_string())
    }
}

/// Parses a numeric cell; `NaN` counts as missing.
pub fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}
