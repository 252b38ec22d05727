use chrono::{Duration, NaiveDate, NaiveDateTime};
use halfhour_core::anomaly::{forward_fill, is_anomalous, score_series, zscores};
use halfhour_core::types::{Observation, TimeSeries, ZSCORE_THRESHOLD};

fn start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

fn half_hourly(values: &[f64]) -> TimeSeries {
    let observations = values
        .iter()
        .enumerate()
        .map(|(idx, value)| Observation::new(start() + Duration::minutes(30 * idx as i64), *value))
        .collect();
    TimeSeries::from_observations(observations)
}

#[test]
fn constant_series_has_no_anomalies() {
    let scores = score_series(&half_hourly(&[7.0; 12]));

    assert!(scores.zscores.iter().all(|z| z.is_nan()));
    assert_eq!(scores.anomaly_count(), 0);
    assert_eq!(scores.stats.std_dev, 0.0);
    assert_eq!(scores.stats.mean, 7.0);
}

#[test]
fn single_spike_among_ten_sits_exactly_on_the_threshold() {
    let mut values = vec![10.0; 10];
    values[4] = 100.0;
    let scores = score_series(&half_hourly(&values));

    assert_eq!(scores.stats.mean, 19.0);
    assert_eq!(scores.stats.std_dev, 27.0);
    assert_eq!(scores.zscores[4], 3.0);
    assert_eq!(scores.zscores[0], -1.0 / 3.0);
    assert_eq!(scores.anomaly_count(), 0, "threshold comparison is strict");
}

#[test]
fn single_spike_in_a_longer_series_is_flagged() {
    let mut values = vec![10.0; 21];
    values[13] = 100.0;
    let scores = score_series(&half_hourly(&values));

    // One outlier among n points scores sqrt(n - 1).
    assert!((scores.zscores[13] - 20f64.sqrt()).abs() < 1e-12);
    assert_eq!(scores.anomaly_count(), 1);
    assert!(scores.flags[13]);
}

#[test]
fn flags_match_the_scores() {
    let values: Vec<f64> = (0..200)
        .map(|idx| match idx {
            50 => 900.0,
            120 => -700.0,
            _ => (idx % 7) as f64,
        })
        .collect();
    let scores = score_series(&half_hourly(&values));

    for (z, flag) in scores.zscores.iter().zip(&scores.flags) {
        assert_eq!(*flag, z.abs() > ZSCORE_THRESHOLD);
    }
    assert!(scores.flags[50]);
    assert!(scores.flags[120]);
    assert_eq!(scores.anomaly_count(), 2);
}

#[test]
fn threshold_boundaries() {
    assert!(!is_anomalous(3.0));
    assert!(!is_anomalous(-3.0));
    assert!(is_anomalous(3.000_000_1));
    assert!(is_anomalous(-3.5));
    assert!(!is_anomalous(f64::NAN));
}

#[test]
fn missing_values_are_skipped_by_the_statistics() {
    let (scores, mean, std_dev) = zscores(&[Some(1.0), None, Some(3.0)]);

    assert_eq!(mean, 2.0);
    assert_eq!(std_dev, 1.0);
    assert_eq!(scores[0], -1.0);
    assert!(scores[1].is_nan());
    assert_eq!(scores[2], 1.0);
}

#[test]
fn empty_input_scores_nothing() {
    let scores = score_series(&TimeSeries::default());
    assert!(scores.zscores.is_empty());
    assert!(scores.stats.mean.is_nan());
    assert_eq!(scores.anomaly_count(), 0);
}

#[test]
fn forward_fill_keeps_leading_gaps() {
    let filled = forward_fill(&[None, Some(1.0), None, Some(2.0), None]);
    assert_eq!(filled, vec![None, Some(1.0), Some(1.0), Some(2.0), Some(2.0)]);
}
