pub mod errors;
pub mod formats;
pub mod model;
mod registry;
pub mod schema;

pub use errors::{ParserError, ReaderAttempt};
pub use model::{RawCell, RawPair, RawTable, SourceFormat};
pub use registry::{
    all_reader_descriptors, read_table, read_with_readers, ReaderDescriptor, TableReader,
};
pub use schema::{require_columns, validate_table, REQUIRED_COLUMNS};

#[cfg(test)]
mod tests;
