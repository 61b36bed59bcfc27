//! Error types for ride ingestion and report assembly.
//!
//! Row-level data problems (unparseable dates, out-of-range fares) are not
//! errors: the normalizer drops those rows silently. Only whole-operation
//! failures end up here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a single user action (load, export).
#[derive(Debug, Error)]
pub enum RideError {
    // === Ingestion ===
    /// Failed to open or read an input file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV stream could not be parsed.
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The input has no header row.
    #[error("input has no header row")]
    MissingHeader,

    /// A data row carries more fields than the header declares.
    #[error("line {line}: expected {expected} fields, saw {found}")]
    RaggedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    // === Sample datasets ===
    /// The sample data directory does not exist.
    #[error("sample directory not found: {path}")]
    SampleDirMissing { path: PathBuf },

    /// The sample data directory holds no CSV files.
    #[error("no sample datasets in {dir}")]
    NoSamples { dir: PathBuf },

    /// A named sample file is not present in the sample directory.
    #[error("sample file '{name}' not found in {dir}")]
    SampleNotFound { name: String, dir: PathBuf },

    // === Report assembly ===
    /// Text destined for the PDF contains a character outside Latin-1.
    #[error("character {ch:?} cannot be encoded as Latin-1")]
    Encoding { ch: char },

    /// A chart failed to draw.
    #[error("failed to render chart {chart}: {message}")]
    Chart { chart: &'static str, message: String },

    /// A chart image could not be decoded for embedding.
    #[error("failed to load image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The PDF document could not be written.
    #[error("failed to write PDF: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias for ride operations.
pub type Result<T> = std::result::Result<T, RideError>;
