use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use halfhour_core::config::{AnalyzerConfig, LogFormat, ENV_CONFIG_PATH};
use halfhour_core::outputs::{self, ExportFormat, TableFormat};
use halfhour_core::types::{AnalysisReport, AnomalyRecord, SlotCollision};
use halfhour_core::{analyze_bytes, frames, PipelineError};
use halfhour_parser::all_reader_descriptors;
use polars::prelude::DataFrame;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SCHEMA_ERROR_EXIT: u8 = 2;

#[derive(Parser, Debug)]
#[command(author, version, about = "Half-hourly anomaly and trend analysis", long_about = None)]
struct Cli {
    /// TOML configuration file (falls back to HALFHOUR_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full analysis and write every table plus the anomaly export
    Analyze(AnalyzeArgs),
    /// Write only the anomalous rows
    Anomalies(AnomaliesArgs),
    /// List the supported input formats
    Formats,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// Spreadsheet or delimited file with Timestamp and Value columns
    input: PathBuf,
    #[arg(long)]
    out_dir: Option<PathBuf>,
    /// Anomaly export encoding: xlsx or csv
    #[arg(long)]
    export: Option<ExportFormat>,
    /// Encoding of the derived tables: csv or parquet
    #[arg(long)]
    tables: Option<TableFormat>,
    /// How duplicate readings in one weekly pivot cell combine: last or mean
    #[arg(long)]
    pivot_collision: Option<SlotCollision>,
}

#[derive(Args, Debug)]
struct AnomaliesArgs {
    input: PathBuf,
    /// Destination file; the extension picks the encoding (default anomalies.xlsx)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err:#}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(config.log_format);

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let schema_error = err
                .chain()
                .filter_map(|cause| cause.downcast_ref::<PipelineError>())
                .find(|cause| cause.is_schema_error());
            if let Some(schema_error) = schema_error {
                eprintln!("{schema_error}");
                return ExitCode::from(SCHEMA_ERROR_EXIT);
            }
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalyzerConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from));

    let mut config = match path {
        Some(path) => AnalyzerConfig::from_file(&path)
            .with_context(|| format!("failed to load configuration '{}'", path.display()))?,
        None => AnalyzerConfig::default(),
    };
    config
        .apply_process_env()
        .context("invalid HALFHOUR_* environment variable")?;
    Ok(config)
}

fn run(command: Command, config: AnalyzerConfig) -> Result<()> {
    match command {
        Command::Analyze(args) => handle_analyze(args, config),
        Command::Anomalies(args) => handle_anomalies(args, config),
        Command::Formats => {
            print_formats();
            Ok(())
        }
    }
}

fn handle_analyze(args: AnalyzeArgs, mut config: AnalyzerConfig) -> Result<()> {
    if let Some(out_dir) = args.out_dir {
        config.out_dir = out_dir;
    }
    if let Some(export) = args.export {
        config.export_format = export;
    }
    if let Some(tables) = args.tables {
        config.table_format = tables;
    }
    if let Some(policy) = args.pivot_collision {
        config.pivot_collision = policy;
    }

    let report = load_report(&args.input, &config)?;

    fs::create_dir_all(&config.out_dir).with_context(|| {
        format!("failed to create output directory '{}'", config.out_dir.display())
    })?;

    write_table(&config, "annotated", &frames::annotated_frame(&report.observations)?)?;
    write_table(&config, "daily_average", &frames::daily_frame(&report.daily)?)?;
    write_table(
        &config,
        "weekday_weekend",
        &frames::weekday_weekend_frame(&report.weekday_weekend)?,
    )?;
    write_table(&config, "weekly_pivot", &frames::pivot_frame(&report.weekly_pivot)?)?;

    let export_path = config
        .out_dir
        .join(format!("anomalies.{}", config.export_format.extension()));
    write_export(&report, config.export_format, &export_path)?;

    let summary_path = config.out_dir.join("summary.json");
    let summary = serde_json::to_vec_pretty(&report.summary())?;
    fs::write(&summary_path, summary)
        .with_context(|| format!("failed to write '{}'", summary_path.display()))?;

    print_summary(&report);
    println!("{}", anomaly_table(&report.anomaly_records()));
    info!(out_dir = %config.out_dir.display(), "Analysis written");
    Ok(())
}

fn handle_anomalies(args: AnomaliesArgs, config: AnalyzerConfig) -> Result<()> {
    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("anomalies.{}", config.export_format)));
    let format = match output.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext
            .parse::<ExportFormat>()
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("cannot export to '{}'", output.display()))?,
        None => config.export_format,
    };

    let report = load_report(&args.input, &config)?;
    write_export(&report, format, &output)?;
    println!("{}", anomaly_table(&report.anomaly_records()));
    println!(
        "Wrote {} anomalous rows to {}",
        report.anomalies().count(),
        output.display()
    );
    Ok(())
}

fn load_report(input: &Path, config: &AnalyzerConfig) -> Result<AnalysisReport> {
    let content = fs::read(input)
        .with_context(|| format!("failed to read input file '{}'", input.display()))?;
    let file_name = input.file_name().and_then(|name| name.to_str());
    info!(input = %input.display(), bytes = content.len(), "Analyzing file");

    let report = analyze_bytes(&content, file_name, &config.pipeline_options())?;
    if report.cleaning.dropped_rows > 0 {
        warn!(
            dropped = report.cleaning.dropped_rows,
            "Some rows had no numeric Value and were skipped"
        );
    }
    Ok(report)
}

fn write_table(config: &AnalyzerConfig, stem: &str, df: &DataFrame) -> Result<()> {
    let path = config
        .out_dir
        .join(format!("{stem}.{}", config.table_format.extension()));
    let bytes = outputs::encode_frame(df, config.table_format)?;
    fs::write(&path, bytes).with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(())
}

fn write_export(report: &AnalysisReport, format: ExportFormat, path: &Path) -> Result<()> {
    let bytes = outputs::export_anomalies(&report.anomaly_records(), format)?;
    fs::write(path, bytes).with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(())
}

fn print_summary(report: &AnalysisReport) {
    let summary = report.summary();
    let fmt_float = |value: f64| {
        if value.is_nan() {
            "-".to_string()
        } else {
            format!("{value:.3}")
        }
    };

    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Rows read".to_string(), summary.cleaning.input_rows.to_string()]);
    table.add_row(vec![
        "Rows dropped".to_string(),
        summary.cleaning.dropped_rows.to_string(),
    ]);
    table.add_row(vec!["Observations".to_string(), summary.observations.to_string()]);
    table.add_row(vec!["Anomalies (|z| > 3)".to_string(), summary.anomalies.to_string()]);
    table.add_row(vec![
        "First timestamp".to_string(),
        summary
            .first_timestamp
            .map(outputs::format_timestamp)
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Last timestamp".to_string(),
        summary
            .last_timestamp
            .map(outputs::format_timestamp)
            .unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec!["Days".to_string(), summary.days.to_string()]);
    table.add_row(vec!["Weeks".to_string(), summary.weeks.to_string()]);
    table.add_row(vec!["Mean".to_string(), fmt_float(summary.zscore.mean)]);
    table.add_row(vec!["Std dev".to_string(), fmt_float(summary.zscore.std_dev)]);
    for row in &summary.weekday_weekend {
        table.add_row(vec![
            format!("{} average", row.label()),
            fmt_float(row.mean_value),
        ]);
    }
    println!("{table}");
}

fn anomaly_table(records: &[AnomalyRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Timestamp", "Value", "ZScore"]);
    for record in records {
        table.add_row(vec![
            outputs::format_timestamp(record.timestamp),
            record.value.to_string(),
            format!("{:.3}", record.zscore),
        ]);
    }
    table
}

fn print_formats() {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Reader", "Extensions", "Description"]);
    for descriptor in all_reader_descriptors() {
        table.add_row(vec![
            descriptor.code.to_string(),
            descriptor.extensions.join(", "),
            descriptor.description.to_string(),
        ]);
    }
    println!("{table}");
}
