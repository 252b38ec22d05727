use tracing::debug;

use crate::types::{TimeSeries, ZScoreStats, ZSCORE_THRESHOLD};

#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyScores {
    pub zscores: Vec<f64>,
    pub flags: Vec<bool>,
    pub stats: ZScoreStats,
}

impl AnomalyScores {
    pub fn anomaly_count(&self) -> usize {
        self.flags.iter().filter(|flag| **flag).count()
    }
}

/// Carries the last present value forward. Leading gaps stay empty.
pub fn forward_fill(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = None;
    values
        .iter()
        .map(|value| {
            if value.is_some() {
                last = *value;
            }
            last
        })
        .collect()
}

/// Whole-series z-scores with the population standard deviation (ddof = 0).
/// Missing positions score `NaN` and do not take part in the statistics; a zero
/// deviation scores every position `NaN`.
pub fn zscores(values: &[Option<f64>]) -> (Vec<f64>, f64, f64) {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return (vec![f64::NAN; values.len()], f64::NAN, f64::NAN);
    }

    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let variance = present.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    let scores = values
        .iter()
        .map(|value| match value {
            Some(x) if std_dev != 0.0 => (x - mean) / std_dev,
            _ => f64::NAN,
        })
        .collect();

    (scores, mean, std_dev)
}

/// `NaN` never compares greater, so undefined scores are never anomalous.
pub fn is_anomalous(zscore: f64) -> bool {
    zscore.abs() > ZSCORE_THRESHOLD
}

pub fn score_series(series: &TimeSeries) -> AnomalyScores {
    let raw: Vec<Option<f64>> = series
        .observations()
        .iter()
        .map(|obs| Some(obs.value))
        .collect();
    let filled = forward_fill(&raw);
    let (zscores, mean, std_dev) = zscores(&filled);
    let flags: Vec<bool> = zscores.iter().map(|z| is_anomalous(*z)).collect();

    let scores = AnomalyScores {
        zscores,
        flags,
        stats: ZScoreStats {
            mean,
            std_dev,
            threshold: ZSCORE_THRESHOLD,
        },
    };
    debug!(
        rows = series.len(),
        mean,
        std_dev,
        anomalies = scores.anomaly_count(),
        "Scored series"
    );
    scores
}
