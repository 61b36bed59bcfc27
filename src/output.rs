//! Output formatting and persistence for rides and metrics.
//!
//! Supports pretty-printing, JSON serialization, and CSV export of the
//! canonical table.

use anyhow::Result;
use tracing::debug;

use crate::analyzers::MetricsBundle;
use crate::ingest::RawTable;
use crate::model::RideTable;
use csv::WriterBuilder;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Logs a metrics bundle using Rust's debug pretty-print format.
pub fn print_pretty(metrics: &MetricsBundle) {
    debug!("{:#?}", metrics);
}

/// Prints a metrics bundle as pretty-printed JSON followed by a newline.
pub fn print_json<W: Write>(mut writer: W, metrics: &MetricsBundle) -> Result<()> {
    writeln!(writer, "{}", metrics_json(metrics)?)?;
    Ok(())
}

/// Renders a metrics bundle as pretty-printed JSON.
pub fn metrics_json(metrics: &MetricsBundle) -> Result<String> {
    Ok(serde_json::to_string_pretty(metrics)?)
}

/// Writes the canonical table as CSV, derived columns included.
pub fn write_table<W: Write>(writer: W, table: &RideTable) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);

    writer.write_record(table.column_names())?;
    for row in table.to_rows() {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;

    Ok(())
}

/// Writes the canonical table to a CSV file, replacing any existing file.
pub fn save_table(path: &Path, table: &RideTable) -> Result<()> {
    debug!(path = %path.display(), rows = table.len(), "Writing canonical CSV");
    let file = File::create(path)?;
    write_table(file, table)
}

/// Converts the canonical table back into a [`RawTable`], as if re-read from CSV.
pub fn to_raw(table: &RideTable) -> Result<RawTable> {
    let mut buf = Vec::new();
    write_table(&mut buf, table)?;
    Ok(RawTable::from_reader(buf.as_slice())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Field, Ride};
    use chrono::{NaiveDate, NaiveTime};
    use std::env;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    fn table() -> RideTable {
        RideTable {
            columns: [Field::RideDate, Field::RideTime, Field::Fare]
                .into_iter()
                .collect(),
            extra_columns: vec!["note".to_string()],
            rides: vec![Ride {
                ride_date: NaiveDate::from_ymd_opt(2024, 2, 5),
                ride_time: NaiveTime::from_hms_opt(7, 5, 0),
                fare: Some(120.5),
                extra: vec![None],
                ..Default::default()
            }],
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&MetricsBundle::default());
    }

    #[test]
    fn test_print_json_writes_one_document() {
        let mut buf = Vec::new();
        print_json(&mut buf, &MetricsBundle::default()).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.ends_with("}\n"));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["total_rides"], 0);
    }

    #[test]
    fn test_metrics_json_has_fixed_keys() {
        let json = metrics_json(&MetricsBundle::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total_rides"], 0);
        assert!(value["peak_hour"].is_null());
        assert!(value.get("rides_by_pickup_ride_type").is_some());
    }

    #[test]
    fn test_write_table_renders_derived_columns() {
        let mut buf = Vec::new();
        write_table(&mut buf, &table()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(
            lines[0],
            "ride_date,ride_time,fare,ride_date_display,hour,ride_time_display,day_of_week,note"
        );
        assert_eq!(lines[1], "2024-02-05,07:05:00,120.5,2024-02-05,7,07:05:00,Monday,");
    }

    #[test]
    fn test_save_table_creates_file() {
        let path = temp_path("rideiq_test_save_table.csv");
        let _ = fs::remove_file(&path);

        save_table(&path, &table()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_to_raw_reads_back() {
        let raw = to_raw(&table()).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw.column_index("fare"), Some(2));
        assert_eq!(raw.rows[0][7], None);
    }
}
