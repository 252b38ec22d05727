use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

static EMPTY_CELL: RawCell = RawCell::Empty;

/// A single cell as it came out of the source file, before any coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl RawCell {
    pub fn from_text(value: &str) -> Self {
        if value.trim().is_empty() {
            RawCell::Empty
        } else {
            RawCell::Text(value.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RawCell::Empty)
    }
}

impl fmt::Display for RawCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCell::Empty => Ok(()),
            RawCell::Text(text) => f.write_str(text),
            RawCell::Number(value) => write!(f, "{value}"),
            RawCell::Bool(value) => write!(f, "{value}"),
            RawCell::DateTime(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Delimited,
    Spreadsheet,
}

impl SourceFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFormat::Delimited => "delimited",
            SourceFormat::Spreadsheet => "spreadsheet",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header row plus data rows. Every row is padded or truncated to the header width.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<RawCell>>,
    pub source: SourceFormat,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<RawCell>>, source: SourceFormat) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, RawCell::Empty);
                row
            })
            .collect();
        Self {
            headers,
            rows,
            source,
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First column carrying exactly this name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> &RawCell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// The two fields the pipeline needs from each input row, still unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPair {
    pub timestamp: RawCell,
    pub value: RawCell,
}
