use halfhour_parser::ParserError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error("Timestamp column could not be parsed: data row {row} holds '{value}'")]
    TimestampParse { row: usize, value: String },

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV writing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(String),
}

impl PipelineError {
    /// True when the input lacked a required column. This is the one failure meant
    /// to be shown to the person who supplied the file.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Parser(ParserError::MissingColumns { .. })
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
