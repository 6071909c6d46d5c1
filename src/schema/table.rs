//! Raw delimited table
//!
//! The bulk sheet arrives as delimited text with one header row. Cells are
//! kept as trimmed strings; typing happens in the extractor.

use crate::error::ScoreError;
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Rectangular table of trimmed text cells
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    width: usize,
}

impl RawTable {
    /// Build a table from in-memory cells, padding short rows
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = rows
            .iter()
            .map(|r| r.len())
            .chain(std::iter::once(headers.len()))
            .max()
            .unwrap_or(0);

        let mut headers = headers;
        headers.resize(width, String::new());

        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self {
            headers,
            rows,
            width,
        }
    }

    /// Read a comma-delimited table
    pub fn from_csv_str(text: &str) -> Result<Self, ScoreError> {
        Self::from_reader(text.as_bytes(), b',')
    }

    /// Read a delimited table from any reader
    pub fn from_reader<R: Read>(reader: R, delimiter: u8) -> Result<Self, ScoreError> {
        let mut csv_reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
        if let Some(first) = headers.first_mut() {
            if let Some(stripped) = first.strip_prefix(UTF8_BOM) {
                *first = stripped.trim().to_string();
            }
        }

        let mut rows = Vec::new();
        for record in csv_reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        if headers.is_empty() && rows.is_empty() {
            return Err(ScoreError::MalformedInput(
                "input contains no header row".to_string(),
            ));
        }

        tracing::debug!(rows = rows.len(), columns = headers.len(), "loaded raw table");
        Ok(Self::new(headers, rows))
    }

    /// Read a delimited table from a file
    pub fn from_path(path: &Path, delimiter: u8) -> Result<Self, ScoreError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, delimiter)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of columns (widest of header and data rows)
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell text; empty string outside the table
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }
}
