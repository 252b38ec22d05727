use chrono::{NaiveDate, NaiveDateTime};
use halfhour_parser::{RawCell, RawPair};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::types::{CleaningSummary, Observation, TimeSeries};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

#[derive(Debug, Clone)]
pub struct CleanedSeries {
    pub series: TimeSeries,
    pub summary: CleaningSummary,
}

/// Parses every timestamp (any failure aborts the whole batch), sorts stably by time,
/// then drops the rows whose value cannot be read as a number. Rows with both cells
/// blank are dropped up front, as exporters often leave a few at the end of a sheet.
pub fn clean(pairs: Vec<RawPair>) -> Result<CleanedSeries> {
    let input_rows = pairs.len();

    let mut stamped = Vec::with_capacity(input_rows);
    for (row, pair) in pairs.into_iter().enumerate() {
        if pair.timestamp.is_empty() && pair.value.is_empty() {
            continue;
        }
        let timestamp =
            parse_timestamp_cell(&pair.timestamp).ok_or_else(|| PipelineError::TimestampParse {
                row,
                value: pair.timestamp.to_string(),
            })?;
        stamped.push((timestamp, pair.value));
    }

    stamped.sort_by_key(|(timestamp, _)| *timestamp);

    let observations: Vec<Observation> = stamped
        .into_iter()
        .filter_map(|(timestamp, value)| {
            coerce_value(&value).map(|value| Observation::new(timestamp, value))
        })
        .collect();

    let summary = CleaningSummary {
        input_rows,
        dropped_rows: input_rows - observations.len(),
    };
    if summary.dropped_rows > 0 {
        warn!(
            dropped = summary.dropped_rows,
            input = input_rows,
            "Dropped rows with non-numeric values"
        );
    }
    debug!(rows = observations.len(), "Cleaned series");

    Ok(CleanedSeries {
        series: TimeSeries::from_observations(observations),
        summary,
    })
}

/// Naive local instant for a timestamp cell. Bare dates resolve to midnight.
pub fn parse_timestamp_cell(cell: &RawCell) -> Option<NaiveDateTime> {
    match cell {
        RawCell::DateTime(value) => Some(*value),
        RawCell::Text(text) => parse_timestamp_text(text),
        RawCell::Empty | RawCell::Number(_) | RawCell::Bool(_) => None,
    }
}

fn parse_timestamp_text(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Permissive numeric coercion; `None` means the row gets dropped.
pub fn coerce_value(cell: &RawCell) -> Option<f64> {
    let value = match cell {
        RawCell::Number(value) => *value,
        RawCell::Bool(flag) => f64::from(u8::from(*flag)),
        RawCell::Text(text) => text.trim().parse::<f64>().ok()?,
        RawCell::Empty | RawCell::DateTime(_) => return None,
    };
    (!value.is_nan()).then_some(value)
}

#[cfg(test)]
mod coercion {
    use super::*;

    fn text(value: &str) -> RawCell {
        RawCell::Text(value.to_string())
    }

    #[test]
    fn accepts_common_timestamp_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(13, 30, 0)
            .unwrap();
        for raw in [
            "2024-01-05 13:30:00",
            "2024-01-05T13:30:00",
            "2024-01-05 13:30",
            "2024/01/05 13:30",
            "01/05/2024 13:30",
            " 2024-01-05 13:30:00.000 ",
        ] {
            assert_eq!(parse_timestamp_cell(&text(raw)), Some(expected), "{raw}");
        }

        let midnight = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp_cell(&text("2024-01-05")), Some(midnight));
        assert_eq!(parse_timestamp_cell(&RawCell::DateTime(expected)), Some(expected));
    }

    #[test]
    fn rejects_unusable_timestamps() {
        assert_eq!(parse_timestamp_cell(&RawCell::Empty), None);
        assert_eq!(parse_timestamp_cell(&RawCell::Number(45_000.0)), None);
        assert_eq!(parse_timestamp_cell(&text("yesterday")), None);
        assert_eq!(parse_timestamp_cell(&text("2024-13-01 00:00")), None);
    }

    #[test]
    fn coerces_values_like_a_numeric_cast() {
        assert_eq!(coerce_value(&text(" 12.25 ")), Some(12.25));
        assert_eq!(coerce_value(&text("-1e3")), Some(-1000.0));
        assert_eq!(coerce_value(&RawCell::Number(4.0)), Some(4.0));
        assert_eq!(coerce_value(&RawCell::Bool(true)), Some(1.0));
        assert_eq!(coerce_value(&text("bad")), None);
        assert_eq!(coerce_value(&text("NaN")), None);
        assert_eq!(coerce_value(&text("1,000")), None);
        assert_eq!(coerce_value(&RawCell::Empty), None);
    }
}
