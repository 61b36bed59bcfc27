//! The loaded dataset and everything derived from it.
//!
//! A [`Session`] is built once per user action: select a source, ingest,
//! normalize, analyze. It is immutable afterwards; picking another source
//! means building a new session.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use tracing::{error, info};

use crate::analyzers::{Insights, MetricsBundle, analyze};
use crate::charts::{self, ChartArtifact};
use crate::config::AppConfig;
use crate::error::{RideError, Result};
use crate::ingest::RawTable;
use crate::model::RideTable;
use crate::normalize::normalize_as_of;
use crate::report;

/// Where a dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// A CSV file supplied by the user.
    Upload(PathBuf),
    /// A named CSV file inside the sample data directory.
    Sample { data_dir: PathBuf, name: String },
}

impl DataSource {
    /// Resolves the source to a readable file path.
    pub fn resolve(&self) -> Result<PathBuf> {
        match self {
            DataSource::Upload(path) => Ok(path.clone()),
            DataSource::Sample { data_dir, name } => {
                let samples = list_samples(data_dir)?;
                if samples.is_empty() {
                    return Err(RideError::NoSamples {
                        dir: data_dir.clone(),
                    });
                }
                if !samples.iter().any(|s| s == name) {
                    return Err(RideError::SampleNotFound {
                        name: name.clone(),
                        dir: data_dir.clone(),
                    });
                }
                Ok(data_dir.join(name))
            }
        }
    }
}

impl std::fmt::Display for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::Upload(path) => write!(f, "{}", path.display()),
            DataSource::Sample { name, .. } => write!(f, "sample:{name}"),
        }
    }
}

/// Lists the `.csv` file names in `dir`, sorted.
pub fn list_samples(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Err(RideError::SampleDirMissing {
            path: dir.to_path_buf(),
        });
    }

    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.ends_with(".csv") {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[derive(Debug, Clone)]
pub struct Session {
    pub source: DataSource,
    pub table: RideTable,
    pub metrics: MetricsBundle,
    pub insights: Insights,
}

impl Session {
    /// Loads and analyzes a dataset, keeping only rides dated today or earlier.
    pub fn load(source: DataSource) -> Result<Self> {
        Self::load_as_of(source, Local::now().date_naive())
    }

    #[tracing::instrument(skip_all, fields(source = %source, today = %today))]
    pub fn load_as_of(source: DataSource, today: NaiveDate) -> Result<Self> {
        let path = source.resolve()?;
        let raw = RawTable::from_path(&path)?;
        let session = Self::from_raw(source, raw, today);
        info!(
            rows = session.table.len(),
            columns = session.table.column_names().len(),
            "Dataset loaded"
        );
        Ok(session)
    }

    /// Builds a session from rows already in memory.
    pub fn from_raw(source: DataSource, raw: RawTable, today: NaiveDate) -> Self {
        let table = normalize_as_of(raw, today);
        let metrics = analyze(&table);
        let insights = Insights::from_table(&table);
        Self {
            source,
            table,
            metrics,
            insights,
        }
    }

    pub fn insight_lines(&self) -> Vec<String> {
        self.insights.lines()
    }

    pub fn render_charts(&self, dir: &Path) -> Result<Vec<ChartArtifact>> {
        charts::render_charts(&self.table, &self.metrics, dir)
    }

    /// Renders the charts and writes the PDF report.
    ///
    /// Failures are logged and yield `None`; the session stays usable.
    pub fn export_report(&self, config: &AppConfig) -> Option<PathBuf> {
        match self.try_export_report(config) {
            Ok(path) => Some(path),
            Err(e) => {
                error!(error = %e, report = %config.report_path.display(), "Failed to export report");
                None
            }
        }
    }

    fn try_export_report(&self, config: &AppConfig) -> Result<PathBuf> {
        let plots: Vec<PathBuf> = self
            .render_charts(&config.plots_dir)?
            .into_iter()
            .map(|artifact| artifact.path)
            .collect();
        report::generate_pdf_report(
            &self.metrics,
            &self.insight_lines(),
            &plots,
            &config.report_path,
        )
    }
}
