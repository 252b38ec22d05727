use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use tracing::debug;

use crate::anomaly::AnomalyScores;
use crate::types::{
    AnnotatedObservation, DailyAggregate, PivotKey, SlotCollision, TimeSeries,
    WeekdayWeekendAggregate, WeeklyPivot, ROLLING_WINDOW_DAYS,
};

#[derive(Debug, Clone)]
pub struct TrendAggregates {
    pub daily: Vec<DailyAggregate>,
    pub weekday_weekend: [WeekdayWeekendAggregate; 2],
    pub weekly_pivot: WeeklyPivot,
}

pub fn rolling_window() -> Duration {
    Duration::days(ROLLING_WINDOW_DAYS)
}

/// Neumaier-compensated running sum, so values leaving the window take their rounding
/// error with them.
#[derive(Debug, Default, Clone, Copy)]
struct WindowSum {
    sum: f64,
    compensation: f64,
}

impl WindowSum {
    fn add(&mut self, value: f64) {
        let total = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - total) + value;
        } else {
            self.compensation += (value - total) + self.sum;
        }
        self.sum = total;
    }

    fn remove(&mut self, value: f64) {
        self.add(-value);
    }

    fn total(&self) -> f64 {
        self.sum + self.compensation
    }
}

/// Mean over `(t - window, t]` for every row, where a row only sees itself and the rows
/// before it. The window is wall-clock time, so its row count follows the data density.
pub fn rolling_mean(series: &TimeSeries, window: Duration) -> Vec<Option<f64>> {
    let observations = series.observations();
    let mut means = Vec::with_capacity(observations.len());
    let mut start = 0;
    let mut sum = WindowSum::default();

    for (end, current) in observations.iter().enumerate() {
        let cutoff = current.timestamp - window;
        while start < end && observations[start].timestamp <= cutoff {
            sum.remove(observations[start].value);
            start += 1;
        }
        if start == end {
            sum = WindowSum::default();
        }
        sum.add(current.value);

        let count = end + 1 - start;
        means.push(Some(sum.total() / count as f64));
    }

    means
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

pub fn half_hour_slot(timestamp: NaiveDateTime) -> u32 {
    timestamp.hour() * 2 + timestamp.minute() / 30
}

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Joins the series with its scores and rolling means and derives the calendar fields.
pub fn annotate(
    series: &TimeSeries,
    scores: &AnomalyScores,
    rolling: &[Option<f64>],
) -> Vec<AnnotatedObservation> {
    series
        .observations()
        .iter()
        .enumerate()
        .map(|(idx, obs)| {
            let date = obs.timestamp.date();
            let day_of_week = date.weekday();
            AnnotatedObservation {
                timestamp: obs.timestamp,
                value: obs.value,
                zscore: scores.zscores.get(idx).copied().unwrap_or(f64::NAN),
                is_anomaly: scores.flags.get(idx).copied().unwrap_or(false),
                rolling_mean_7d: rolling.get(idx).copied().flatten(),
                date,
                day_of_week,
                is_weekend: is_weekend(day_of_week),
                week_start: week_start(date),
                weekday_index: day_of_week.num_days_from_monday(),
                half_hour_slot: half_hour_slot(obs.timestamp),
            }
        })
        .collect()
}

pub fn daily_means(observations: &[AnnotatedObservation]) -> Vec<DailyAggregate> {
    let mut groups: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    for obs in observations {
        let entry = groups.entry(obs.date).or_insert((0.0, 0));
        entry.0 += obs.value;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(date, (sum, count))| DailyAggregate {
            date,
            mean_value: sum / count as f64,
        })
        .collect()
}

/// Always two rows, weekday first. An empty partition averages to `NaN`.
pub fn weekday_weekend_means(observations: &[AnnotatedObservation]) -> [WeekdayWeekendAggregate; 2] {
    let mut sums = [0.0f64; 2];
    let mut counts = [0usize; 2];
    for obs in observations {
        let idx = usize::from(obs.is_weekend);
        sums[idx] += obs.value;
        counts[idx] += 1;
    }

    let mean = |idx: usize| {
        if counts[idx] == 0 {
            f64::NAN
        } else {
            sums[idx] / counts[idx] as f64
        }
    };

    [
        WeekdayWeekendAggregate {
            is_weekend: false,
            mean_value: mean(0),
        },
        WeekdayWeekendAggregate {
            is_weekend: true,
            mean_value: mean(1),
        },
    ]
}

#[derive(Default)]
struct SlotAccumulator {
    sum: f64,
    count: usize,
    last: f64,
}

/// Weekday x half-hour grid with one column per calendar week. Only keys that occur in
/// the data become rows; cells with no observation stay `None`.
pub fn weekly_pivot(observations: &[AnnotatedObservation], collision: SlotCollision) -> WeeklyPivot {
    let mut slots: BTreeMap<(PivotKey, NaiveDate), SlotAccumulator> = BTreeMap::new();
    let mut weeks = BTreeSet::new();
    let mut keys = BTreeSet::new();

    for obs in observations {
        let key = obs.pivot_key();
        weeks.insert(obs.week_start);
        keys.insert(key);

        let acc = slots.entry((key, obs.week_start)).or_default();
        acc.sum += obs.value;
        acc.count += 1;
        acc.last = obs.value;
    }

    let weeks: Vec<NaiveDate> = weeks.into_iter().collect();
    let keys: Vec<PivotKey> = keys.into_iter().collect();
    let mut cells = vec![vec![None; weeks.len()]; keys.len()];

    for ((key, week), acc) in slots {
        let (Ok(row), Ok(column)) = (keys.binary_search(&key), weeks.binary_search(&week)) else {
            continue;
        };
        cells[row][column] = Some(match collision {
            SlotCollision::Last => acc.last,
            SlotCollision::Mean => acc.sum / acc.count as f64,
        });
    }

    debug!(
        weeks = weeks.len(),
        slots = keys.len(),
        policy = collision.as_str(),
        "Built weekly pivot"
    );

    WeeklyPivot { weeks, keys, cells }
}

pub fn aggregate(observations: &[AnnotatedObservation], collision: SlotCollision) -> TrendAggregates {
    TrendAggregates {
        daily: daily_means(observations),
        weekday_weekend: weekday_weekend_means(observations),
        weekly_pivot: weekly_pivot(observations, collision),
    }
}
