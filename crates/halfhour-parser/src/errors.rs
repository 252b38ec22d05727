use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct ReaderAttempt {
    pub reader: &'static str,
    pub message: String,
}

impl ReaderAttempt {
    pub fn new(reader: &'static str, message: impl Into<String>) -> Self {
        Self {
            reader,
            message: message.into(),
        }
    }
}

impl fmt::Display for ReaderAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reader, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{reader} format mismatch: {reason}")]
    FormatMismatch {
        reader: &'static str,
        reason: String,
    },

    #[error("File must contain {expected} columns. Missing: {}", .missing.join(", "))]
    MissingColumns {
        expected: String,
        missing: Vec<String>,
    },

    #[error("{reader} CSV error: {source}")]
    Csv {
        reader: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{reader} workbook error: {message}")]
    Spreadsheet {
        reader: &'static str,
        message: String,
    },

    #[error("{reader} input did not contain a header row")]
    EmptyInput { reader: &'static str },

    #[error("no reader recognized this file; attempts: {attempts:?}")]
    NoMatchingParser { attempts: Vec<ReaderAttempt> },
}

impl ParserError {
    pub(crate) fn missing_columns(required: &[&str], missing: Vec<String>) -> Self {
        ParserError::MissingColumns {
            expected: quoted_list(required),
            missing,
        }
    }
}

/// `'A' and 'B'`, `'A', 'B' and 'C'`
fn quoted_list(names: &[&str]) -> String {
    let quoted: Vec<String> = names.iter().map(|name| format!("'{name}'")).collect();
    match quoted.split_last() {
        None => String::new(),
        Some((last, [])) => last.clone(),
        Some((last, rest)) => format!("{} and {last}", rest.join(", ")),
    }
}
