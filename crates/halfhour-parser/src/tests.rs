use std::fs;
use std::path::PathBuf;

use rust_xlsxwriter::Workbook;

use crate::errors::ParserError;
use crate::formats::{DelimitedReader, SpreadsheetReader};
use crate::model::{RawCell, SourceFormat};
use crate::registry::TableReader;
use crate::schema::{require_columns, validate_table, VALUE_COLUMN};
use crate::{all_reader_descriptors, read_table};

fn fixture(path: &str) -> Vec<u8> {
    let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let full_path = base.join("tests/data").join(path);
    fs::read(&full_path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", full_path.display(), err))
}

fn text(value: &str) -> RawCell {
    RawCell::Text(value.to_string())
}

#[test]
fn reads_comma_delimited_fixture() {
    let table = read_table(&fixture("half_hourly_basic.csv"), Some("half_hourly_basic.csv"))
        .expect("csv read failed");

    assert_eq!(table.source, SourceFormat::Delimited);
    assert_eq!(table.headers, vec!["Timestamp", "Value", "Meter"]);
    assert_eq!(table.row_count(), 5);
    assert_eq!(table.cell(0, 1), &text("10.5"));
    assert_eq!(table.cell(2, 1), &text("bad"));
    assert_eq!(table.cell(3, 1), &text(" 12.25 "));
    assert!(table.cell(4, 1).is_empty());
}

#[test]
fn validation_keeps_cells_unparsed() {
    let table = read_table(&fixture("half_hourly_basic.csv"), None).expect("csv read failed");
    let pairs = validate_table(&table).expect("schema should validate");

    assert_eq!(pairs.len(), 5);
    assert_eq!(pairs[0].timestamp, text("2024-01-01 00:00:00"));
    assert_eq!(pairs[2].value, text("bad"));
    assert_eq!(pairs[4].value, RawCell::Empty);
}

#[test]
fn sniffs_semicolon_delimiter_and_column_order() {
    let table = read_table(&fixture("semicolon_export.csv"), Some("export.csv"))
        .expect("semicolon read failed");
    let pairs = validate_table(&table).expect("schema should validate");

    assert_eq!(table.headers, vec!["Site", "Timestamp", "Value"]);
    assert_eq!(pairs[1].timestamp, text("2024-03-04 08:30"));
    assert_eq!(pairs[1].value, text("2.5"));
}

#[test]
fn reads_tab_separated_text() {
    let content = b"Timestamp\tValue\n2024-01-01 00:00:00\t7\n";
    let table = DelimitedReader.read(content).expect("tsv read failed");

    assert_eq!(table.headers, vec!["Timestamp", "Value"]);
    assert_eq!(table.cell(0, 1), &text("7"));
}

#[test]
fn strips_byte_order_mark_and_crlf() {
    let table = read_table(&fixture("excel_bom.csv"), Some("excel_bom.CSV")).expect("bom read");

    assert_eq!(table.headers, vec!["Timestamp", "Value"]);
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.cell(1, 1), &text("2"));
}

#[test]
fn missing_value_column_is_a_schema_error() {
    let table = read_table(&fixture("missing_value.csv"), None).expect("csv read failed");
    let err = validate_table(&table).expect_err("schema should fail");

    match &err {
        ParserError::MissingColumns { missing, .. } => assert_eq!(missing, &vec!["Value"]),
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err
        .to_string()
        .starts_with("File must contain 'Timestamp' and 'Value' columns."));
}

#[test]
fn require_columns_reports_every_missing_name() {
    let table = read_table(&fixture("missing_value.csv"), None).expect("csv read failed");
    let err = require_columns(&table, &["Timestamp", VALUE_COLUMN, "ZScore"])
        .expect_err("two names are missing");

    assert_eq!(
        err.to_string(),
        "File must contain 'Timestamp', 'Value' and 'ZScore' columns. Missing: Value, ZScore"
    );
}

#[test]
fn header_only_file_yields_no_pairs() {
    let table = read_table(&fixture("header_only.csv"), None).expect("header-only read");
    let pairs = validate_table(&table).expect("schema should validate");

    assert_eq!(table.row_count(), 0);
    assert!(pairs.is_empty());
}

#[test]
fn empty_text_has_no_header_row() {
    let err = DelimitedReader.read(b"").expect_err("empty input");
    assert!(matches!(err, ParserError::EmptyInput { reader: "delimited" }));
}

#[test]
fn ragged_rows_are_padded_and_first_duplicate_header_wins() {
    let table = read_table(&fixture("ragged.csv"), None).expect("ragged read");
    let pairs = validate_table(&table).expect("schema should validate");

    assert_eq!(table.column_index("Value"), Some(1));
    assert!(table.cell(0, 2).is_empty());
    assert!(table.cell(0, 3).is_empty());
    assert_eq!(pairs[1].value, text("4"));
}

#[test]
fn extension_pins_the_reader() {
    let err = read_table(&fixture("half_hourly_basic.csv"), Some("upload.xlsx"))
        .expect_err("csv bytes are not a workbook");

    match err {
        ParserError::NoMatchingParser { attempts } => {
            assert_eq!(attempts.len(), 1);
            assert_eq!(attempts[0].reader, "spreadsheet");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn unknown_extension_falls_back_to_detection() {
    let table = read_table(&fixture("half_hourly_basic.csv"), Some("upload.dat"))
        .expect("detection should find the delimited reader");
    assert_eq!(table.source, SourceFormat::Delimited);
}

#[test]
fn binary_garbage_matches_no_reader() {
    let err = read_table(&[0, 159, 146, 150], None).expect_err("garbage");

    match err {
        ParserError::NoMatchingParser { attempts } => {
            let names: Vec<&str> = attempts.iter().map(|attempt| attempt.reader).collect();
            assert_eq!(names, vec!["spreadsheet", "delimited"]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn reads_first_worksheet_of_a_workbook() {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.write_string(0, 0, "Timestamp").unwrap();
    worksheet.write_string(0, 1, "Value").unwrap();
    worksheet.write_string(0, 2, "Meter").unwrap();
    worksheet.write_string(1, 0, "2024-01-01 00:00:00").unwrap();
    worksheet.write_number(1, 1, 1.5).unwrap();
    worksheet.write_string(1, 2, "A").unwrap();
    worksheet.write_string(2, 0, "2024-01-01 00:30:00").unwrap();
    worksheet.write_string(2, 1, "n/a").unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let table = read_table(&bytes, Some("upload.xlsx")).expect("workbook read failed");
    let pairs = validate_table(&table).expect("schema should validate");

    assert_eq!(table.source, SourceFormat::Spreadsheet);
    assert_eq!(table.headers, vec!["Timestamp", "Value", "Meter"]);
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[0].timestamp, text("2024-01-01 00:00:00"));
    assert_eq!(pairs[0].value, RawCell::Number(1.5));
    assert_eq!(pairs[1].value, text("n/a"));

    let detected = read_table(&bytes, None).expect("detection should find the workbook");
    assert_eq!(detected.source, SourceFormat::Spreadsheet);
    assert!(SpreadsheetReader.read(b"Timestamp,Value\n").is_err());
}

#[test]
fn descriptors_cover_every_reader() {
    let codes: Vec<&str> = all_reader_descriptors()
        .iter()
        .map(|descriptor| descriptor.code)
        .collect();
    assert_eq!(codes, vec!["spreadsheet", "delimited"]);
    assert!(all_reader_descriptors()[1].extensions.contains(&"csv"));
}
