use std::path::Path;

use once_cell::sync::Lazy;

use crate::errors::{ParserError, ReaderAttempt};
use crate::formats::{DelimitedReader, SpreadsheetReader};
use crate::model::RawTable;

pub trait TableReader {
    fn name(&self) -> &'static str;
    fn extensions(&self) -> &'static [&'static str];
    fn read(&self, content: &[u8]) -> Result<RawTable, ParserError>;
}

#[derive(Debug, Clone)]
pub struct ReaderDescriptor {
    pub code: &'static str,
    pub extensions: &'static [&'static str],
    pub description: &'static str,
}

static READERS: Lazy<Vec<ReaderDescriptor>> = Lazy::new(|| {
    vec![
        ReaderDescriptor {
            code: SpreadsheetReader.name(),
            extensions: SpreadsheetReader.extensions(),
            description: "First worksheet of an Excel or OpenDocument workbook",
        },
        ReaderDescriptor {
            code: DelimitedReader.name(),
            extensions: DelimitedReader.extensions(),
            description: "UTF-8 text separated by commas, semicolons or tabs",
        },
    ]
});

pub fn all_reader_descriptors() -> &'static [ReaderDescriptor] {
    READERS.as_slice()
}

/// Reads `content` into a [`RawTable`]. A recognised file extension picks the reader
/// directly; otherwise every reader is tried in turn.
pub fn read_table(content: &[u8], file_name: Option<&str>) -> Result<RawTable, ParserError> {
    let spreadsheet = SpreadsheetReader;
    let delimited = DelimitedReader;
    let readers: [&dyn TableReader; 2] = [&spreadsheet, &delimited];

    let extension = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    if let Some(extension) = extension {
        if let Some(reader) = readers
            .iter()
            .find(|reader| reader.extensions().contains(&extension.as_str()))
        {
            return read_with_readers(content, &[*reader]);
        }
    }

    read_with_readers(content, &readers)
}

pub fn read_with_readers(
    content: &[u8],
    readers: &[&dyn TableReader],
) -> Result<RawTable, ParserError> {
    let mut attempts = Vec::new();

    for reader in readers {
        match reader.read(content) {
            Ok(table) => return Ok(table),
            Err(ParserError::FormatMismatch { reason, .. }) => {
                attempts.push(ReaderAttempt::new(reader.name(), reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ParserError::NoMatchingParser { attempts })
}
