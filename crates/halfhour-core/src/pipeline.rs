use halfhour_parser::{read_table, validate_table, RawTable};
use tracing::info;

use crate::anomaly;
use crate::cleaner;
use crate::error::Result;
use crate::trend;
use crate::types::{AnalysisReport, SlotCollision};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    pub pivot_collision: SlotCollision,
}

/// Loader/validator, cleaner, anomaly scorer and trend aggregator, in that order.
/// Every call starts from the table it is given; nothing is retained between calls.
pub fn run_pipeline(table: &RawTable, options: &PipelineOptions) -> Result<AnalysisReport> {
    let pairs = validate_table(table)?;
    let cleaned = cleaner::clean(pairs)?;
    let series = cleaned.series;

    let scores = anomaly::score_series(&series);
    let rolling = trend::rolling_mean(&series, trend::rolling_window());
    let observations = trend::annotate(&series, &scores, &rolling);
    let aggregates = trend::aggregate(&observations, options.pivot_collision);

    info!(
        source = table.source.as_str(),
        rows = cleaned.summary.input_rows,
        dropped = cleaned.summary.dropped_rows,
        anomalies = scores.anomaly_count(),
        weeks = aggregates.weekly_pivot.weeks.len(),
        "Pipeline finished"
    );

    Ok(AnalysisReport {
        observations,
        daily: aggregates.daily,
        weekday_weekend: aggregates.weekday_weekend,
        weekly_pivot: aggregates.weekly_pivot,
        cleaning: cleaned.summary,
        zscore: scores.stats,
    })
}

/// Reads raw file bytes with the reader registry and runs the pipeline on the result.
pub fn analyze_bytes(
    content: &[u8],
    file_name: Option<&str>,
    options: &PipelineOptions,
) -> Result<AnalysisReport> {
    let table = read_table(content, file_name)?;
    run_pipeline(&table, options)
}
