use chrono::{Duration, NaiveDate, NaiveDateTime};
use halfhour_core::cleaner::clean;
use halfhour_core::PipelineError;
use halfhour_parser::{RawCell, RawPair};

fn base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn pair(timestamp: &str, value: &str) -> RawPair {
    RawPair {
        timestamp: RawCell::from_text(timestamp),
        value: RawCell::from_text(value),
    }
}

#[test]
fn sorts_stably_and_drops_non_numeric_values() -> anyhow::Result<()> {
    let pairs = vec![
        pair("2024-01-01 02:00:00", "5"),
        pair("2024-01-01 01:00:00", "3"),
        pair("2024-01-01 01:00:00", "4"),
        pair("2024-01-01 00:00:00", "bad"),
        pair("2024-01-01 00:30:00", ""),
    ];

    let cleaned = clean(pairs)?;
    let values = cleaned.series.values();

    assert_eq!(values, vec![3.0, 4.0, 5.0]);
    assert_eq!(cleaned.summary.input_rows, 5);
    assert_eq!(cleaned.summary.dropped_rows, 2);
    assert_eq!(cleaned.summary.kept_rows(), 3);
    assert_eq!(
        cleaned.series.observations()[0].timestamp,
        base() + Duration::hours(1)
    );
    Ok(())
}

#[test]
fn output_is_sorted_and_numeric_for_scrambled_input() -> anyhow::Result<()> {
    let mut pairs = Vec::new();
    for step in 0..48i64 {
        let shuffled = (step * 17) % 48;
        let ts = base() + Duration::minutes(30 * shuffled);
        let value = if shuffled % 5 == 0 {
            "n/a".to_string()
        } else {
            format!("{}", shuffled as f64 * 0.5)
        };
        pairs.push(RawPair {
            timestamp: RawCell::Text(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
            value: RawCell::Text(value),
        });
    }

    let cleaned = clean(pairs)?;
    let observations = cleaned.series.observations();

    assert!(observations
        .windows(2)
        .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    assert!(observations.iter().all(|obs| obs.value.is_finite()));
    assert_eq!(cleaned.summary.dropped_rows, 10);
    Ok(())
}

#[test]
fn one_bad_timestamp_fails_the_whole_batch() {
    let pairs = vec![
        pair("2024-01-01 00:00:00", "1"),
        pair("not a time", "2"),
        pair("2024-01-01 01:00:00", "3"),
    ];

    match clean(pairs) {
        Err(PipelineError::TimestampParse { row, value }) => {
            assert_eq!(row, 1);
            assert_eq!(value, "not a time");
        }
        other => panic!("expected a timestamp parse failure, got {other:?}"),
    }
}

#[test]
fn blank_timestamp_with_a_value_is_a_parse_failure() {
    let err = clean(vec![pair("", "1")]).expect_err("blank timestamp");
    assert!(matches!(err, PipelineError::TimestampParse { row: 0, .. }));
    assert!(!err.is_schema_error());
}

#[test]
fn fully_blank_rows_are_dropped() -> anyhow::Result<()> {
    let pairs = vec![
        pair("2024-01-01 00:00:00", "1"),
        pair("", ""),
        pair("2024-01-01 00:30:00", "2"),
        pair("  ", ""),
    ];

    let cleaned = clean(pairs)?;
    assert_eq!(cleaned.series.values(), vec![1.0, 2.0]);
    assert_eq!(cleaned.summary.input_rows, 4);
    assert_eq!(cleaned.summary.dropped_rows, 2);
    Ok(())
}

#[test]
fn parse_failures_report_the_original_row() {
    let pairs = vec![pair("", ""), pair("2024-01-01 00:00:00", "1"), pair("noon", "")];
    match clean(pairs) {
        Err(PipelineError::TimestampParse { row, value }) => {
            assert_eq!(row, 2);
            assert_eq!(value, "noon");
        }
        other => panic!("expected a timestamp parse failure, got {other:?}"),
    }
}

#[test]
fn native_cells_pass_through() -> anyhow::Result<()> {
    let pairs = vec![
        RawPair {
            timestamp: RawCell::DateTime(base()),
            value: RawCell::Number(2.5),
        },
        RawPair {
            timestamp: RawCell::DateTime(base() + Duration::minutes(30)),
            value: RawCell::Bool(true),
        },
    ];

    let cleaned = clean(pairs)?;
    assert_eq!(cleaned.series.values(), vec![2.5, 1.0]);
    Ok(())
}

#[test]
fn empty_input_is_an_empty_series() -> anyhow::Result<()> {
    let cleaned = clean(Vec::new())?;
    assert!(cleaned.series.is_empty());
    assert_eq!(cleaned.summary.dropped_rows, 0);
    Ok(())
}
