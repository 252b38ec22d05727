use chrono::{DateTime, NaiveDate, NaiveDateTime, Weekday};
use polars::prelude::*;

use crate::types::{AnnotatedObservation, DailyAggregate, WeekdayWeekendAggregate, WeeklyPivot};

pub const WEEK_COLUMN_FORMAT: &str = "%Y-%m-%d";

fn datetime_series(name: &str, values: impl Iterator<Item = NaiveDateTime>) -> PolarsResult<Series> {
    let micros: Vec<i64> = values.map(|ts| ts.and_utc().timestamp_micros()).collect();
    Series::new(name.into(), micros).cast(&DataType::Datetime(TimeUnit::Microseconds, None))
}

fn date_series(name: &str, values: impl Iterator<Item = NaiveDate>) -> PolarsResult<Series> {
    let epoch = DateTime::UNIX_EPOCH.date_naive();
    let days: Vec<i32> = values
        .map(|date| (date - epoch).num_days() as i32)
        .collect();
    Series::new(name.into(), days).cast(&DataType::Date)
}

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// One row per observation with every derived column.
pub fn annotated_frame(observations: &[AnnotatedObservation]) -> PolarsResult<DataFrame> {
    let timestamps = datetime_series("Timestamp", observations.iter().map(|obs| obs.timestamp))?;
    let values: Vec<f64> = observations.iter().map(|obs| obs.value).collect();
    let zscores: Vec<f64> = observations.iter().map(|obs| obs.zscore).collect();
    let anomalies: Vec<bool> = observations.iter().map(|obs| obs.is_anomaly).collect();
    let rolling: Vec<Option<f64>> = observations.iter().map(|obs| obs.rolling_mean_7d).collect();
    let dates = date_series("Date", observations.iter().map(|obs| obs.date))?;
    let day_names: Vec<&str> = observations
        .iter()
        .map(|obs| day_name(obs.day_of_week))
        .collect();
    let weekend: Vec<bool> = observations.iter().map(|obs| obs.is_weekend).collect();
    let weeks = date_series("Week", observations.iter().map(|obs| obs.week_start))?;
    let weekdays: Vec<u32> = observations.iter().map(|obs| obs.weekday_index).collect();
    let slots: Vec<u32> = observations.iter().map(|obs| obs.half_hour_slot).collect();

    DataFrame::new(vec![
        timestamps.into(),
        Series::new("Value".into(), values).into(),
        Series::new("ZScore".into(), zscores).into(),
        Series::new("Anomaly".into(), anomalies).into(),
        Series::new("Rolling7d".into(), rolling).into(),
        dates.into(),
        Series::new("DayOfWeek".into(), day_names).into(),
        Series::new("IsWeekend".into(), weekend).into(),
        weeks.into(),
        Series::new("Weekday".into(), weekdays).into(),
        Series::new("HalfHour".into(), slots).into(),
    ])
}

pub fn daily_frame(daily: &[DailyAggregate]) -> PolarsResult<DataFrame> {
    let dates = date_series("Date", daily.iter().map(|row| row.date))?;
    let means: Vec<f64> = daily.iter().map(|row| row.mean_value).collect();
    DataFrame::new(vec![
        dates.into(),
        Series::new("DailyAverage".into(), means).into(),
    ])
}

pub fn weekday_weekend_frame(rows: &[WeekdayWeekendAggregate]) -> PolarsResult<DataFrame> {
    let labels: Vec<&str> = rows.iter().map(|row| row.label()).collect();
    let means: Vec<f64> = rows.iter().map(|row| row.mean_value).collect();
    DataFrame::new(vec![
        Series::new("Category".into(), labels).into(),
        Series::new("Average".into(), means).into(),
    ])
}

/// `Weekday`, `HalfHour`, then one nullable column per week named by its Monday.
pub fn pivot_frame(pivot: &WeeklyPivot) -> PolarsResult<DataFrame> {
    let weekdays: Vec<u32> = pivot.keys.iter().map(|key| key.weekday_index).collect();
    let slots: Vec<u32> = pivot.keys.iter().map(|key| key.half_hour_slot).collect();

    let mut columns: Vec<Column> = Vec::with_capacity(pivot.weeks.len() + 2);
    columns.push(Series::new("Weekday".into(), weekdays).into());
    columns.push(Series::new("HalfHour".into(), slots).into());

    for (idx, week) in pivot.weeks.iter().enumerate() {
        let values: Vec<Option<f64>> = pivot.cells.iter().map(|row| row[idx]).collect();
        let name = week.format(WEEK_COLUMN_FORMAT).to_string();
        columns.push(Series::new(name.into(), values).into());
    }

    DataFrame::new(columns)
}
