//! Runtime configuration read from the environment.
//!
//! `main` loads a `.env` file with `dotenvy` first, so every value here can
//! come from either source. Command-line flags override per command.

use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_PLOTS_DIR: &str = "plots";
pub const DEFAULT_REPORT_PATH: &str = "RideIQ_Report.pdf";
pub const DEFAULT_LOG_FILE_PATH: &str = "logs/rideiq.log";

/// Where sample datasets live and where generated artifacts go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Directory scanned for sample `.csv` datasets.
    pub data_dir: PathBuf,
    /// Directory chart PNGs are written into.
    pub plots_dir: PathBuf,
    /// Output path of the PDF report.
    pub report_path: PathBuf,
    pub log_file_path: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.into(),
            plots_dir: DEFAULT_PLOTS_DIR.into(),
            report_path: DEFAULT_REPORT_PATH.into(),
            log_file_path: DEFAULT_LOG_FILE_PATH.into(),
        }
    }
}

impl AppConfig {
    /// Reads `RIDEIQ_DATA_DIR`, `RIDEIQ_PLOTS_DIR`, `RIDEIQ_REPORT_PATH` and
    /// `LOG_FILE_PATH`, falling back to the defaults for unset or empty values.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| -> PathBuf {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
                .into()
        };

        Self {
            data_dir: get("RIDEIQ_DATA_DIR", DEFAULT_DATA_DIR),
            plots_dir: get("RIDEIQ_PLOTS_DIR", DEFAULT_PLOTS_DIR),
            report_path: get("RIDEIQ_REPORT_PATH", DEFAULT_REPORT_PATH),
            log_file_path: get("LOG_FILE_PATH", DEFAULT_LOG_FILE_PATH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.report_path, PathBuf::from("RideIQ_Report.pdf"));
    }

    #[test]
    fn test_lookup_overrides() {
        let vars: HashMap<&str, &str> = [
            ("RIDEIQ_DATA_DIR", "/srv/rides"),
            ("RIDEIQ_PLOTS_DIR", ""),
            ("RIDEIQ_REPORT_PATH", "out/report.pdf"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.data_dir, PathBuf::from("/srv/rides"));
        assert_eq!(config.plots_dir, PathBuf::from("plots"));
        assert_eq!(config.report_path, PathBuf::from("out/report.pdf"));
        assert_eq!(config.log_file_path, PathBuf::from("logs/rideiq.log"));
    }
}
