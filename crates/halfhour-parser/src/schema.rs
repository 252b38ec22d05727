use crate::errors::ParserError;
use crate::model::{RawPair, RawTable};

pub const TIMESTAMP_COLUMN: &str = "Timestamp";
pub const VALUE_COLUMN: &str = "Value";
pub const ZSCORE_COLUMN: &str = "ZScore";

pub const REQUIRED_COLUMNS: [&str; 2] = [TIMESTAMP_COLUMN, VALUE_COLUMN];

/// Resolves each required name to its column index, failing with every missing name at once.
pub fn require_columns(table: &RawTable, names: &[&str]) -> Result<Vec<usize>, ParserError> {
    let mut indices = Vec::with_capacity(names.len());
    let mut missing = Vec::new();

    for name in names {
        match table.column_index(name) {
            Some(index) => indices.push(index),
            None => missing.push(name.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(indices)
    } else {
        Err(ParserError::missing_columns(names, missing))
    }
}

/// Checks for the `Timestamp` and `Value` columns and returns their cells row by row.
pub fn validate_table(table: &RawTable) -> Result<Vec<RawPair>, ParserError> {
    let indices = require_columns(table, &REQUIRED_COLUMNS)?;
    let (ts_idx, value_idx) = (indices[0], indices[1]);

    Ok((0..table.row_count())
        .map(|row| RawPair {
            timestamp: table.cell(row, ts_idx).clone(),
            value: table.cell(row, value_idx).clone(),
        })
        .collect())
}
