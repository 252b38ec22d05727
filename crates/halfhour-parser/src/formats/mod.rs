mod delimited;
mod spreadsheet;

pub use delimited::DelimitedReader;
pub use spreadsheet::SpreadsheetReader;
