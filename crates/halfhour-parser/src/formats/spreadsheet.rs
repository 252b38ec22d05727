use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::errors::ParserError;
use crate::model::{RawCell, RawTable, SourceFormat};
use crate::registry::TableReader;

const READER_NAME: &str = "spreadsheet";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

pub struct SpreadsheetReader;

impl TableReader for SpreadsheetReader {
    fn name(&self) -> &'static str {
        READER_NAME
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["xlsx", "xlsm", "xls", "ods"]
    }

    fn read(&self, content: &[u8]) -> Result<RawTable, ParserError> {
        if !(content.starts_with(ZIP_MAGIC) || content.starts_with(OLE_MAGIC)) {
            return Err(ParserError::FormatMismatch {
                reader: READER_NAME,
                reason: "content is not a zip or OLE workbook container".to_string(),
            });
        }

        let mut workbook = open_workbook_auto_from_rs(Cursor::new(content.to_vec())).map_err(
            |err| ParserError::Spreadsheet {
                reader: READER_NAME,
                message: format!("failed to open workbook: {err}"),
            },
        )?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or(ParserError::EmptyInput {
                reader: READER_NAME,
            })?
            .map_err(|err| ParserError::Spreadsheet {
                reader: READER_NAME,
                message: format!("failed to read first worksheet: {err}"),
            })?;

        let mut rows = range.rows();
        let header = rows.next().ok_or(ParserError::EmptyInput {
            reader: READER_NAME,
        })?;
        let headers: Vec<String> = header.iter().map(|cell| cell.to_string()).collect();

        let body = rows
            .map(|row| row.iter().map(convert_cell).collect())
            .collect();

        Ok(RawTable::new(headers, body, SourceFormat::Spreadsheet))
    }
}

fn convert_cell(cell: &Data) -> RawCell {
    match cell {
        Data::Empty => RawCell::Empty,
        Data::String(text) | Data::DateTimeIso(text) => RawCell::from_text(text),
        Data::Float(value) => RawCell::Number(*value),
        Data::Int(value) => RawCell::Number(*value as f64),
        Data::Bool(value) => RawCell::Bool(*value),
        Data::DateTime(value) => value
            .as_datetime()
            .map(RawCell::DateTime)
            .unwrap_or_else(|| RawCell::Number(value.as_f64())),
        other => RawCell::Text(other.to_string()),
    }
}
