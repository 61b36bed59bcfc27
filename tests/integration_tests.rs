use chrono::NaiveDate;
use rideiq::analyzers::{Insights, analyze};
use rideiq::ingest::RawTable;
use rideiq::model::{Field, RideTable};
use rideiq::normalize::{MAX_DISTANCE_KM, MAX_FARE, normalize_as_of};
use rideiq::output::to_raw;
use rideiq::report::sanitize_text;
use rideiq::session::{DataSource, Session};
use std::collections::HashSet;
use std::path::PathBuf;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/rides.csv")
}

fn fixture_table() -> RideTable {
    let raw = RawTable::from_path(&fixture_path()).expect("Failed to read fixture");
    normalize_as_of(raw, today())
}

fn ids(table: &RideTable) -> Vec<&str> {
    table
        .rides
        .iter()
        .filter_map(|r| r.ride_id.as_deref())
        .collect()
}

#[test]
fn test_full_pipeline() {
    let session = Session::load_as_of(DataSource::Upload(fixture_path()), today())
        .expect("Failed to load fixture");

    assert_eq!(
        ids(&session.table),
        vec!["R001", "R002", "R003", "R004", "R005", "R012", "R013"]
    );

    let metrics = &session.metrics;
    assert_eq!(metrics.total_rides, 7);
    assert_eq!(metrics.total_revenue, Some(1425.0));
    assert!((metrics.avg_fare.unwrap() - 1425.0 / 7.0).abs() < 1e-9);
    assert_eq!(metrics.peak_hour, Some(18));

    assert_eq!(
        session.insight_lines(),
        vec![
            "Average Fare: ₹203.57",
            "Peak Ride Hour: 18:00",
            "Most Popular Ride Type: Mini",
            "Highest Revenue Day: 2024-03-15",
            "Top Pickup: Airport → Top Drop: Airport",
        ]
    );
}

#[test]
fn test_fixture_cleaning_details() {
    let table = fixture_table();

    // median of the twelve fares present after duplicate removal
    let r004 = &table.rides[3];
    assert_eq!(r004.fare, Some(205.0));

    let r003 = &table.rides[2];
    assert_eq!(r003.pickup_location.as_deref(), Some("Mall"));
    assert_eq!(table.rides[0].drop_location.as_deref(), Some("City Center"));

    assert_eq!(table.extra_columns, vec!["payment_method"]);
    assert_eq!(table.rides[0].extra, vec![Some("card".to_string())]);
    assert_eq!(table.rides[5].duration_mins, None);
}

#[test]
fn test_canonical_invariants() {
    let table = fixture_table();

    let rows = table.to_rows();
    let unique: HashSet<_> = rows.iter().collect();
    assert_eq!(unique.len(), rows.len());

    for ride in &table.rides {
        let date = ride.ride_date.unwrap();
        assert!(date <= today());
        let fare = ride.fare.unwrap();
        assert!(fare > 0.0 && fare < MAX_FARE);
        let distance = ride.distance_km.unwrap();
        assert!(distance > 0.0 && distance < MAX_DISTANCE_KM);
        assert_eq!(
            ride.day_of_week().unwrap(),
            date.format("%A").to_string()
        );
    }
}

#[test]
fn test_normalize_is_idempotent() {
    let table = fixture_table();
    let again = normalize_as_of(to_raw(&table).unwrap(), today());
    assert_eq!(again, table);
}

#[test]
fn test_weekend_split_sums_to_total() {
    let metrics = analyze(&fixture_table());
    let split = metrics.weekend_vs_weekday.as_ref().unwrap();

    assert_eq!(split[0].label, "Weekend");
    assert_eq!(split[0].count, 4);
    assert_eq!(metrics.weekend_split_total(), Some(metrics.total_rides));
}

#[test]
fn test_scenario_future_row_dropped() {
    let raw = RawTable::from_strs(
        &["ride_date", "ride_time", "fare", "distance_km"],
        &[&["2024-06-02", "10:00:00", "100", "5"]],
    );
    let table = normalize_as_of(raw, today());
    assert!(table.is_empty());
    assert_eq!(analyze(&table).total_rides, 0);
}

#[test]
fn test_scenario_median_fill() {
    let raw = RawTable::from_strs(
        &["fare", "distance_km"],
        &[&["10", "1"], &["20", "1"], &["", "1"], &["30", "1"]],
    );
    let table = normalize_as_of(raw, today());
    let metrics = analyze(&table);

    assert_eq!(table.numbers(Field::Fare).unwrap(), vec![10.0, 20.0, 20.0, 30.0]);
    assert_eq!(metrics.total_rides, 4);
    assert_eq!(metrics.total_revenue, Some(80.0));
    assert_eq!(metrics.avg_fare, Some(20.0));
}

#[test]
fn test_scenario_fare_outlier_excluded() {
    let raw = RawTable::from_strs(
        &["fare", "distance_km"],
        &[&["100", "4"], &["15000", "4"], &["120", "6"]],
    );
    let metrics = analyze(&normalize_as_of(raw, today()));
    assert_eq!(metrics.total_rides, 2);
    assert_eq!(metrics.max_fare, Some(120.0));
}

#[test]
fn test_scenario_exact_duplicates() {
    let row: &[&str] = &["2024-01-01", "08:00:00", "Airport", "50", "3"];
    let raw = RawTable::from_strs(
        &["ride_date", "ride_time", "pickup_location", "fare", "distance_km"],
        &[row, row],
    );
    assert_eq!(normalize_as_of(raw, today()).len(), 1);
}

#[test]
fn test_scenario_time_derivations() {
    let raw = RawTable::from_strs(
        &["ride_date", "ride_time", "fare", "distance_km"],
        &[&["2024-01-01", "09:15:00", "50", "3"]],
    );
    let table = normalize_as_of(raw, today());
    let ride = &table.rides[0];

    assert_eq!(ride.hour(), Some(9));
    assert_eq!(ride.ride_time_display().as_deref(), Some("09:15:00"));
}

#[test]
fn test_insights_match_bundle_peak_hour() {
    let table = fixture_table();
    assert_eq!(Insights::from_table(&table).peak_hour, analyze(&table).peak_hour);
}

#[test]
fn test_sanitize_report_text() {
    assert_eq!(sanitize_text("₹100 – done…"), "Rs.100 - done...");
}
