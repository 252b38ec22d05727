use std::fmt;
use std::io::{Cursor, Write};
use std::str::FromStr;

use chrono::NaiveDateTime;
use halfhour_parser::schema::{TIMESTAMP_COLUMN, VALUE_COLUMN, ZSCORE_COLUMN};
use halfhour_parser::{read_table, require_columns};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};

use crate::cleaner::{coerce_value, parse_timestamp_cell};
use crate::error::{PipelineError, Result};
use crate::types::AnomalyRecord;

pub const ANOMALY_SHEET: &str = "Anomalies";
const EXPORT_HEADERS: [&str; 3] = [TIMESTAMP_COLUMN, VALUE_COLUMN, ZSCORE_COLUMN];

/// Encoding of the anomaly download.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format '{other}'")),
        }
    }
}

/// Encoding of the derived tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableFormat {
    #[default]
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Parquet => "parquet",
        }
    }
}

impl fmt::Display for TableFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for TableFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(TableFormat::Csv),
            "parquet" => Ok(TableFormat::Parquet),
            other => Err(format!("unknown table format '{other}'")),
        }
    }
}

/// Text form used for exported timestamps; the fraction only appears when non-zero.
pub fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

pub fn write_anomalies_csv<W: Write>(records: &[AnomalyRecord], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(EXPORT_HEADERS)?;
    for record in records {
        csv_writer.write_record([
            format_timestamp(record.timestamp),
            record.value.to_string(),
            record.zscore.to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Single `Anomalies` sheet, header row first, no index column.
pub fn anomalies_xlsx_bytes(records: &[AnomalyRecord]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(ANOMALY_SHEET)?;

    for (col, header) in EXPORT_HEADERS.iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }
    for (idx, record) in records.iter().enumerate() {
        let row = (idx + 1) as u32;
        worksheet.write_string(row, 0, format_timestamp(record.timestamp))?;
        worksheet.write_number(row, 1, record.value)?;
        worksheet.write_number(row, 2, record.zscore)?;
    }

    Ok(workbook.save_to_buffer()?)
}

pub fn export_anomalies(records: &[AnomalyRecord], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Xlsx => anomalies_xlsx_bytes(records),
        ExportFormat::Csv => {
            let mut buffer = Vec::new();
            write_anomalies_csv(records, &mut buffer)?;
            Ok(buffer)
        }
    }
}

/// Reads an anomaly export (either encoding) back into records, in file order.
pub fn parse_anomaly_export(content: &[u8], file_name: Option<&str>) -> Result<Vec<AnomalyRecord>> {
    let table = read_table(content, file_name)?;
    let indices = require_columns(&table, &EXPORT_HEADERS)?;

    let mut records = Vec::with_capacity(table.row_count());
    for row in 0..table.row_count() {
        let ts_cell = table.cell(row, indices[0]);
        let timestamp =
            parse_timestamp_cell(ts_cell).ok_or_else(|| PipelineError::TimestampParse {
                row,
                value: ts_cell.to_string(),
            })?;
        let value = coerce_value(table.cell(row, indices[1])).ok_or_else(|| {
            PipelineError::Validation(format!("anomaly export row {row} has no numeric Value"))
        })?;
        let zscore = coerce_value(table.cell(row, indices[2])).ok_or_else(|| {
            PipelineError::Validation(format!("anomaly export row {row} has no numeric ZScore"))
        })?;
        records.push(AnomalyRecord {
            timestamp,
            value,
            zscore,
        });
    }

    Ok(records)
}

pub fn write_frame_csv<W: Write>(df: &mut DataFrame, writer: W) -> Result<()> {
    CsvWriter::new(writer).include_header(true).finish(df)?;
    Ok(())
}

pub fn create_parquet_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    {
        let mut cursor = Cursor::new(&mut buffer);
        let mut clone = df.clone();
        ParquetWriter::new(&mut cursor)
            .with_compression(ParquetCompression::Zstd(None))
            .with_statistics(StatisticsOptions::default())
            .finish(&mut clone)?;
    }
    Ok(buffer)
}

pub fn encode_frame(df: &DataFrame, format: TableFormat) -> Result<Vec<u8>> {
    match format {
        TableFormat::Csv => {
            let mut buffer = Vec::new();
            let mut clone = df.clone();
            write_frame_csv(&mut clone, &mut buffer)?;
            Ok(buffer)
        }
        TableFormat::Parquet => create_parquet_bytes(df),
    }
}
