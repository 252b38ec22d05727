use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

pub const ZSCORE_THRESHOLD: f64 = 3.0;
pub const ROLLING_WINDOW_DAYS: i64 = 7;
pub const SLOTS_PER_DAY: u32 = 48;
pub const SLOTS_PER_WEEK: u32 = 7 * SLOTS_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub timestamp: NaiveDateTime,
    pub value: f64,
}

impl Observation {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Observations ordered by timestamp. Construction sorts stably, so rows sharing a
/// timestamp keep the order they were supplied in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    observations: Vec<Observation>,
}

impl TimeSeries {
    pub fn from_observations(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|obs| obs.timestamp);
        Self { observations }
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|obs| obs.value).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedObservation {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub zscore: f64,
    pub is_anomaly: bool,
    pub rolling_mean_7d: Option<f64>,
    pub date: NaiveDate,
    pub day_of_week: Weekday,
    pub is_weekend: bool,
    pub week_start: NaiveDate,
    pub weekday_index: u32,
    pub half_hour_slot: u32,
}

impl AnnotatedObservation {
    pub fn pivot_key(&self) -> PivotKey {
        PivotKey::new(self.weekday_index, self.half_hour_slot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub mean_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeekdayWeekendAggregate {
    pub is_weekend: bool,
    pub mean_value: f64,
}

impl WeekdayWeekendAggregate {
    pub fn label(&self) -> &'static str {
        if self.is_weekend {
            "Weekend"
        } else {
            "Weekday"
        }
    }
}

/// Time-of-week bucket: `weekday_index` 0 (Monday) to 6, `half_hour_slot` 0 to 47.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PivotKey {
    pub weekday_index: u32,
    pub half_hour_slot: u32,
}

impl PivotKey {
    pub fn new(weekday_index: u32, half_hour_slot: u32) -> Self {
        Self {
            weekday_index,
            half_hour_slot,
        }
    }

    /// Position along the week, always below [`SLOTS_PER_WEEK`].
    pub fn ordinal(&self) -> u32 {
        let ordinal = self.weekday_index * SLOTS_PER_DAY + self.half_hour_slot;
        debug_assert!(ordinal < SLOTS_PER_WEEK, "pivot key out of range: {self:?}");
        ordinal
    }
}

/// How several observations landing on the same key in the same week are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotCollision {
    #[default]
    #[serde(alias = "last_wins")]
    Last,
    Mean,
}

impl SlotCollision {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotCollision::Last => "last",
            SlotCollision::Mean => "mean",
        }
    }
}

impl fmt::Display for SlotCollision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotCollision {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last" | "last_wins" => Ok(SlotCollision::Last),
            "mean" | "average" => Ok(SlotCollision::Mean),
            other => Err(format!("unknown pivot collision policy '{other}'")),
        }
    }
}

/// Rows are keyed by [`PivotKey`] in ascending order, columns by `week_start` ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeeklyPivot {
    pub weeks: Vec<NaiveDate>,
    pub keys: Vec<PivotKey>,
    pub cells: Vec<Vec<Option<f64>>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekLine {
    pub week_start: NaiveDate,
    pub points: Vec<(u32, Option<f64>)>,
}

impl WeeklyPivot {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn value(&self, key: PivotKey, week_start: NaiveDate) -> Option<f64> {
        let row = self.keys.binary_search(&key).ok()?;
        let column = self.weeks.binary_search(&week_start).ok()?;
        self.cells[row][column]
    }

    pub fn column(&self, week_start: NaiveDate) -> Option<Vec<Option<f64>>> {
        let column = self.weeks.binary_search(&week_start).ok()?;
        Some(self.cells.iter().map(|row| row[column]).collect())
    }

    /// One line per week for the overlay chart, x = time-of-week ordinal.
    pub fn week_lines(&self) -> Vec<WeekLine> {
        self.weeks
            .iter()
            .enumerate()
            .map(|(column, week_start)| WeekLine {
                week_start: *week_start,
                points: self
                    .keys
                    .iter()
                    .zip(&self.cells)
                    .map(|(key, row)| (key.ordinal(), row[column]))
                    .collect(),
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CleaningSummary {
    pub input_rows: usize,
    pub dropped_rows: usize,
}

impl CleaningSummary {
    pub fn kept_rows(&self) -> usize {
        self.input_rows - self.dropped_rows
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZScoreStats {
    pub mean: f64,
    pub std_dev: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyRecord {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    pub zscore: f64,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub observations: Vec<AnnotatedObservation>,
    pub daily: Vec<DailyAggregate>,
    pub weekday_weekend: [WeekdayWeekendAggregate; 2],
    pub weekly_pivot: WeeklyPivot,
    pub cleaning: CleaningSummary,
    pub zscore: ZScoreStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub cleaning: CleaningSummary,
    pub observations: usize,
    pub anomalies: usize,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
    pub days: usize,
    pub weeks: usize,
    pub zscore: ZScoreStats,
    pub weekday_weekend: [WeekdayWeekendAggregate; 2],
}

impl AnalysisReport {
    pub fn anomalies(&self) -> impl Iterator<Item = &AnnotatedObservation> + '_ {
        self.observations.iter().filter(|obs| obs.is_anomaly)
    }

    /// Flagged rows in timestamp order, ready for export.
    pub fn anomaly_records(&self) -> Vec<AnomalyRecord> {
        self.anomalies()
            .map(|obs| AnomalyRecord {
                timestamp: obs.timestamp,
                value: obs.value,
                zscore: obs.zscore,
            })
            .collect()
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            cleaning: self.cleaning,
            observations: self.observations.len(),
            anomalies: self.anomalies().count(),
            first_timestamp: self.observations.first().map(|obs| obs.timestamp),
            last_timestamp: self.observations.last().map(|obs| obs.timestamp),
            days: self.daily.len(),
            weeks: self.weekly_pivot.weeks.len(),
            zscore: self.zscore,
            weekday_weekend: self.weekday_weekend,
        }
    }
}
