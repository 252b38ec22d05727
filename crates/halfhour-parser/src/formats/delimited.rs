use csv::ReaderBuilder;

use crate::errors::ParserError;
use crate::model::{RawCell, RawTable, SourceFormat};
use crate::registry::TableReader;

const READER_NAME: &str = "delimited";
const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

pub struct DelimitedReader;

impl TableReader for DelimitedReader {
    fn name(&self) -> &'static str {
        READER_NAME
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["csv", "tsv", "txt"]
    }

    fn read(&self, content: &[u8]) -> Result<RawTable, ParserError> {
        let text = std::str::from_utf8(content).map_err(|err| ParserError::FormatMismatch {
            reader: READER_NAME,
            reason: format!("content is not UTF-8 text: {err}"),
        })?;
        if text.contains('\0') {
            return Err(ParserError::FormatMismatch {
                reader: READER_NAME,
                reason: "content contains NUL bytes".to_string(),
            });
        }

        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let delimiter = sniff_delimiter(text);

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());
        let mut records = reader.records();

        let header = match records.next() {
            Some(record) => record.map_err(csv_error)?,
            None => return Err(ParserError::EmptyInput {
                reader: READER_NAME,
            }),
        };
        let headers: Vec<String> = header.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in records {
            let record = record.map_err(csv_error)?;
            rows.push(record.iter().map(RawCell::from_text).collect());
        }

        Ok(RawTable::new(headers, rows, SourceFormat::Delimited))
    }
}

fn csv_error(source: csv::Error) -> ParserError {
    ParserError::Csv {
        reader: READER_NAME,
        source,
    }
}

/// Most frequent candidate on the header line; comma on ties.
fn sniff_delimiter(text: &str) -> u8 {
    let header_line = text.lines().next().unwrap_or_default();
    let mut best = b',';
    let mut best_count = 0usize;
    for candidate in CANDIDATE_DELIMITERS {
        let count = header_line.bytes().filter(|b| *b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}
