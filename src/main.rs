//! CLI entry point for RideIQ.
//!
//! Loads a rides CSV, either an uploaded file or a named sample, then shows
//! the dashboard, prints the metrics, writes the cleaned CSV, renders the
//! charts or assembles the PDF report.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use rideiq::analyzers::insights::or_na;
use rideiq::config::AppConfig;
use rideiq::model::{Field, Ride, RideTable};
use rideiq::output::{print_json, print_pretty, save_table, write_table};
use rideiq::session::{DataSource, Session, list_samples};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const NO_SOURCE: &str = "No dataset loaded yet. Please select a data source.";

#[derive(Parser)]
#[command(name = "rideiq")]
#[command(about = "Clean, analyze and report on ride CSV data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Path to a rides CSV file
    #[arg(short, long, value_name = "PATH", conflicts_with = "sample")]
    file: Option<PathBuf>,

    /// Name of a sample dataset (e.g. "rides.csv") in the data directory
    #[arg(short, long, value_name = "NAME")]
    sample: Option<String>,

    /// Directory holding sample datasets [env: RIDEIQ_DATA_DIR]
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a preview of the cleaned data, key metrics and insights
    Dashboard {
        #[command(flatten)]
        source: SourceArgs,

        /// Number of preview rows
        #[arg(short = 'n', long, default_value_t = 20)]
        rows: usize,
    },
    /// Print the full metrics bundle as JSON
    Metrics {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Write the cleaned dataset as CSV
    Clean {
        #[command(flatten)]
        source: SourceArgs,

        /// Output CSV file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render chart images
    Charts {
        #[command(flatten)]
        source: SourceArgs,

        /// Directory to write PNGs into [env: RIDEIQ_PLOTS_DIR]
        #[arg(short = 'd', long)]
        plots_dir: Option<PathBuf>,
    },
    /// Render charts and assemble the PDF report
    Report {
        #[command(flatten)]
        source: SourceArgs,

        /// Output PDF file [env: RIDEIQ_REPORT_PATH]
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory to write PNGs into [env: RIDEIQ_PLOTS_DIR]
        #[arg(short = 'd', long)]
        plots_dir: Option<PathBuf>,
    },
    /// List the sample datasets
    Samples {
        /// Directory holding sample datasets [env: RIDEIQ_DATA_DIR]
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

impl SourceArgs {
    fn into_source(self, config: &AppConfig) -> Result<DataSource> {
        match (self.file, self.sample) {
            (Some(path), _) => Ok(DataSource::Upload(path)),
            (None, Some(name)) => Ok(DataSource::Sample {
                data_dir: self.data_dir.unwrap_or_else(|| config.data_dir.clone()),
                name,
            }),
            (None, None) => bail!(NO_SOURCE),
        }
    }

    fn load(self, config: &AppConfig) -> Result<Session> {
        let source = self.into_source(config)?;
        let label = source.to_string();
        Session::load(source).with_context(|| format!("Failed to load dataset {label}"))
    }
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file
    let mut config = AppConfig::from_env();
    let _file_guard = init_logging(&config.log_file_path)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Dashboard { source, rows } => {
            let session = source.load(&config)?;
            print_dashboard(&session, rows);
        }
        Commands::Metrics { source } => {
            let session = source.load(&config)?;
            print_pretty(&session.metrics);
            print_json(std::io::stdout().lock(), &session.metrics)?;
        }
        Commands::Clean { source, output } => {
            let session = source.load(&config)?;
            match output {
                Some(path) => {
                    save_table(&path, &session.table)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), rows = session.table.len(), "Cleaned CSV written");
                }
                None => write_table(std::io::stdout().lock(), &session.table)?,
            }
        }
        Commands::Charts { source, plots_dir } => {
            if let Some(dir) = plots_dir {
                config.plots_dir = dir;
            }
            let session = source.load(&config)?;
            let artifacts = session
                .render_charts(&config.plots_dir)
                .context("Failed to render charts")?;
            for artifact in &artifacts {
                println!("{}", artifact.path.display());
            }
        }
        Commands::Report {
            source,
            output,
            plots_dir,
        } => {
            if let Some(dir) = plots_dir {
                config.plots_dir = dir;
            }
            if let Some(path) = output {
                config.report_path = path;
            }
            let session = source.load(&config)?;
            match session.export_report(&config) {
                Some(path) => println!("PDF generated: {}", path.display()),
                None => bail!("Report export failed, see log for details"),
            }
        }
        Commands::Samples { data_dir } => {
            let dir = data_dir.unwrap_or_else(|| config.data_dir.clone());
            let samples = list_samples(&dir)
                .with_context(|| format!("Failed to list samples in {}", dir.display()))?;
            if samples.is_empty() {
                warn!(dir = %dir.display(), "No sample datasets found");
            }
            for name in samples {
                println!("{name}");
            }
        }
    }

    Ok(())
}

/// Logging setup: colored stderr + JSON rolling log file.
fn init_logging(log_file_path: &Path) -> Result<WorkerGuard> {
    let log_dir = log_file_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("logs"));
    let log_file_name = log_file_path
        .file_name()
        .unwrap_or(OsStr::new("rideiq.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

fn print_dashboard(session: &Session, rows: usize) {
    let table = &session.table;
    println!("Dataset: {}", session.source);
    println!(
        "Rows: {} | Columns: {}",
        table.len(),
        table.column_names().len()
    );

    println!();
    println!("{}", preview_table(table, rows));

    println!();
    println!("Key Metrics");
    let metrics = &session.metrics;
    println!("  Total Rides: {}", metrics.total_rides);
    println!(
        "  Average Fare: {}",
        or_na(metrics.avg_fare.map(|v| format!("₹{v:.2}")))
    );
    println!(
        "  Total Revenue: {}",
        or_na(metrics.total_revenue.map(|v| format!("₹{v:.2}")))
    );
    println!(
        "  Peak Hour: {}",
        or_na(metrics.peak_hour.map(|h| format!("{h}:00")))
    );

    println!();
    println!("Insights");
    for line in session.insight_lines() {
        println!("  {line}");
    }
}

type Column = (&'static str, fn(&Ride) -> Option<String>);

/// Preview columns in display order, restricted to those the table has.
fn preview_columns(table: &RideTable) -> Vec<Column> {
    let candidates: [(bool, Column); 10] = [
        (table.has(Field::RideId), ("ride_id", |r| r.ride_id.clone())),
        (
            table.has(Field::RideDate),
            ("ride_date_display", Ride::ride_date_display),
        ),
        (
            table.has(Field::RideTime),
            ("ride_time_display", Ride::ride_time_display),
        ),
        (
            table.has(Field::PickupLocation),
            ("pickup_location", |r| r.pickup_location.clone()),
        ),
        (
            table.has(Field::DropLocation),
            ("drop_location", |r| r.drop_location.clone()),
        ),
        (table.has(Field::Fare), ("fare", |r| r.cell(Field::Fare))),
        (
            table.has(Field::DistanceKm),
            ("distance_km", |r| r.cell(Field::DistanceKm)),
        ),
        (table.has(Field::RideType), ("ride_type", |r| r.ride_type.clone())),
        (
            table.has(Field::DurationMins),
            ("duration_mins", |r| r.cell(Field::DurationMins)),
        ),
        (
            table.has(Field::RideDate),
            ("day_of_week", |r| r.day_of_week().map(str::to_string)),
        ),
    ];
    candidates
        .into_iter()
        .filter_map(|(present, column)| present.then_some(column))
        .collect()
}

fn preview_table(table: &RideTable, rows: usize) -> Table {
    let columns = preview_columns(table);

    let mut preview = Table::new();
    preview
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            columns
                .iter()
                .map(|(name, _)| Cell::new(name).add_attribute(Attribute::Bold)),
        );

    for ride in table.rides.iter().take(rows) {
        preview.add_row(columns.iter().map(|(name, value)| {
            let cell = match value(ride) {
                Some(text) => Cell::new(text),
                None => Cell::new("-").fg(Color::DarkGrey),
            };
            if matches!(*name, "fare" | "distance_km" | "duration_mins") {
                cell.set_alignment(CellAlignment::Right)
            } else {
                cell
            }
        }));
    }
    preview
}
