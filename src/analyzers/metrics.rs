use crate::analyzers::types::{
    Describe, LabelCount, LabelMean, LongTrip, MetricsBundle, PairCount,
};
use crate::analyzers::utility::{mean, mode, pearson, quantile, sorted, stddev, value_counts};
use crate::model::{Field, Ride, RideTable, is_weekend, weekday_name};
use chrono::{Datelike, Weekday};
use std::collections::BTreeMap;
use tracing::debug;

/// Number of entries kept by every top-N table.
pub const TOP_N: usize = 5;

/// Computes the [`MetricsBundle`] for a canonical table.
///
/// Entries whose source columns are absent are left as `None`; nothing
/// here fails.
#[tracing::instrument(skip_all, fields(rows = table.len()))]
pub fn analyze(table: &RideTable) -> MetricsBundle {
    let rides = &table.rides;
    let has = |field: Field| table.has(field);

    let fares = table.numbers(Field::Fare);
    let distances = table.numbers(Field::DistanceKm);

    let mut bundle = MetricsBundle {
        total_rides: rides.len(),
        ..Default::default()
    };

    // 1. key metrics
    if let Some(fares) = &fares {
        bundle.avg_fare = mean(fares);
        bundle.max_fare = fares.iter().copied().reduce(f64::max);
        bundle.min_fare = fares.iter().copied().reduce(f64::min);
        bundle.total_revenue = Some(fares.iter().sum());
        bundle.fare_stats = Some(describe(fares));
    }
    if let Some(distances) = &distances {
        bundle.avg_distance = mean(distances);
        bundle.distance_stats = Some(describe(distances));
    }

    // 2. trends
    if table.columns.has_hour() {
        bundle.peak_hour = mode(rides.iter().filter_map(Ride::hour));
        bundle.rides_per_hour = Some(count_by(rides.iter().filter_map(Ride::hour)));
        if has(Field::Fare) {
            bundle.avg_fare_per_hour = Some(mean_by(
                rides.iter().filter_map(|r| Some((r.hour()?, r.fare?))),
            ));
        }
    }

    if table.columns.has_day_of_week() {
        let dates = || rides.iter().filter_map(|r| r.ride_date);
        bundle.rides_per_day = Some(count_by(dates()));
        bundle.rides_per_month = Some(count_by(dates().map(|d| d.format("%Y-%m").to_string())));
        bundle.rides_per_day_of_week = Some(
            count_by(dates().map(|d| d.weekday().num_days_from_monday()))
                .into_iter()
                .map(|(day, count)| LabelCount {
                    label: day_label(day),
                    count,
                })
                .collect(),
        );
        bundle.weekend_vs_weekday = Some(labelled(value_counts(dates().map(|d| {
            if is_weekend(d.weekday()) {
                "Weekend"
            } else {
                "Weekday"
            }
        }))));

        if has(Field::Fare) {
            bundle.revenue_per_day = Some(sum_by(
                rides.iter().filter_map(|r| Some((r.ride_date?, r.fare?))),
            ));
            bundle.avg_fare_by_day_of_week = Some(weekday_means(rides, |r| r.fare));
        }
        if has(Field::DistanceKm) {
            bundle.avg_distance_by_day_of_week = Some(weekday_means(rides, |r| r.distance_km));
        }
    }

    // 3. ride types and locations
    if has(Field::RideType) {
        let types = || rides.iter().filter_map(|r| r.ride_type.clone());
        bundle.ride_type_distribution = Some(labelled(value_counts(types())));

        if has(Field::Fare) {
            bundle.avg_fare_by_ride_type = Some(mean_by(
                rides.iter().filter_map(|r| Some((r.ride_type.clone()?, r.fare?))),
            ));
        }
        if has(Field::DistanceKm) {
            bundle.avg_distance_by_ride_type = Some(mean_by(
                rides
                    .iter()
                    .filter_map(|r| Some((r.ride_type.clone()?, r.distance_km?))),
            ));
        }
    }
    if has(Field::PickupLocation) {
        bundle.top_pickup_locations = Some(top_labels(
            rides.iter().filter_map(|r| r.pickup_location.clone()),
        ));
    }
    if has(Field::DropLocation) {
        bundle.top_drop_locations = Some(top_labels(
            rides.iter().filter_map(|r| r.drop_location.clone()),
        ));
    }

    // 4. combined
    if has(Field::DistanceKm) && has(Field::Fare) && has(Field::RideDate) {
        bundle.top_longest_trips = Some(longest_trips(rides));
    }
    if has(Field::DistanceKm) && has(Field::Fare) {
        let (xs, ys): (Vec<f64>, Vec<f64>) = rides
            .iter()
            .filter_map(|r| Some((r.fare?, r.distance_km?)))
            .unzip();
        bundle.fare_distance_correlation = pearson(&xs, &ys);
    }
    if has(Field::PickupLocation) && has(Field::RideType) {
        bundle.rides_by_pickup_ride_type = Some(pickup_ride_type_pairs(rides));
    }

    debug!(
        total_rides = bundle.total_rides,
        peak_hour = ?bundle.peak_hour,
        "Metrics computed"
    );
    bundle
}

/// Descriptive statistics of a numeric column.
pub fn describe(values: &[f64]) -> Describe {
    let sorted = sorted(values);
    let avg = mean(values);
    Describe {
        count: values.len(),
        mean: avg,
        std: avg.and_then(|m| stddev(values, m)),
        min: sorted.first().copied(),
        p25: quantile(&sorted, 0.25),
        p50: quantile(&sorted, 0.5),
        p75: quantile(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

fn count_by<K: Ord>(keys: impl Iterator<Item = K>) -> BTreeMap<K, usize> {
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    counts
}

fn sum_by<K: Ord>(pairs: impl Iterator<Item = (K, f64)>) -> BTreeMap<K, f64> {
    let mut sums = BTreeMap::new();
    for (key, value) in pairs {
        *sums.entry(key).or_insert(0.0) += value;
    }
    sums
}

fn mean_by<K: Ord>(pairs: impl Iterator<Item = (K, f64)>) -> BTreeMap<K, f64> {
    let mut acc: BTreeMap<K, (f64, usize)> = BTreeMap::new();
    for (key, value) in pairs {
        let entry = acc.entry(key).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    acc.into_iter()
        .map(|(key, (sum, n))| (key, sum / n as f64))
        .collect()
}

fn weekday_means(rides: &[Ride], value: impl Fn(&Ride) -> Option<f64>) -> Vec<LabelMean> {
    mean_by(rides.iter().filter_map(|r| {
        Some((r.weekday()?.num_days_from_monday(), value(r)?))
    }))
    .into_iter()
    .map(|(day, mean)| LabelMean {
        label: day_label(day),
        mean,
    })
    .collect()
}

fn day_label(days_from_monday: u32) -> String {
    let day = (0..days_from_monday).fold(Weekday::Mon, |d, _| d.succ());
    weekday_name(day).to_string()
}

fn labelled<L: ToString>(counts: Vec<(L, usize)>) -> Vec<LabelCount> {
    counts
        .into_iter()
        .map(|(label, count)| LabelCount {
            label: label.to_string(),
            count,
        })
        .collect()
}

fn top_labels(items: impl Iterator<Item = String>) -> Vec<LabelCount> {
    let mut counts = value_counts(items);
    counts.truncate(TOP_N);
    labelled(counts)
}

/// Longest trips by distance; equal distances keep row order.
fn longest_trips(rides: &[Ride]) -> Vec<LongTrip> {
    let mut trips: Vec<LongTrip> = rides
        .iter()
        .filter_map(|r| {
            Some(LongTrip {
                ride_date: r.ride_date?,
                pickup_location: r.pickup_location.clone(),
                drop_location: r.drop_location.clone(),
                distance_km: r.distance_km?,
                fare: r.fare?,
            })
        })
        .collect();
    trips.sort_by(|a, b| b.distance_km.total_cmp(&a.distance_km));
    trips.truncate(TOP_N);
    trips
}

/// Most common (pickup, ride type) pairs. Groups start in key order, so
/// equal counts resolve alphabetically.
fn pickup_ride_type_pairs(rides: &[Ride]) -> Vec<PairCount> {
    let groups = count_by(
        rides
            .iter()
            .filter_map(|r| Some((r.pickup_location.clone()?, r.ride_type.clone()?))),
    );
    let mut pairs: Vec<PairCount> = groups
        .into_iter()
        .map(|((pickup_location, ride_type), count)| PairCount {
            pickup_location,
            ride_type,
            count,
        })
        .collect();
    pairs.sort_by(|a, b| b.count.cmp(&a.count));
    pairs.truncate(TOP_N);
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ColumnSet;
    use chrono::{NaiveDate, NaiveTime};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ride(day: &str, hour: u32, pickup: &str, drop: &str, fare: f64, km: f64, kind: &str) -> Ride {
        Ride {
            ride_date: Some(date(day)),
            ride_time: NaiveTime::from_hms_opt(hour, 0, 0),
            pickup_location: Some(pickup.to_string()),
            drop_location: Some(drop.to_string()),
            fare: Some(fare),
            distance_km: Some(km),
            ride_type: Some(kind.to_string()),
            ..Default::default()
        }
    }

    fn full_columns() -> ColumnSet {
        [
            Field::RideDate,
            Field::RideTime,
            Field::PickupLocation,
            Field::DropLocation,
            Field::Fare,
            Field::DistanceKm,
            Field::RideType,
        ]
        .into_iter()
        .collect()
    }

    fn sample_table() -> RideTable {
        RideTable {
            columns: full_columns(),
            extra_columns: vec![],
            rides: vec![
                // 2024-03-15 is a Friday, 2024-03-16 a Saturday
                ride("2024-03-15", 9, "Airport", "Mall", 100.0, 10.0, "Mini"),
                ride("2024-03-15", 18, "Station", "Airport", 200.0, 20.0, "Sedan"),
                ride("2024-03-16", 9, "Airport", "Station", 300.0, 30.0, "Mini"),
                ride("2024-04-01", 18, "Mall", "Airport", 400.0, 40.0, "Auto"),
            ],
        }
    }

    #[test]
    fn test_scalars() {
        let m = analyze(&sample_table());
        assert_eq!(m.total_rides, 4);
        assert_eq!(m.avg_fare, Some(250.0));
        assert_eq!(m.max_fare, Some(400.0));
        assert_eq!(m.min_fare, Some(100.0));
        assert_eq!(m.avg_distance, Some(25.0));
        assert_eq!(m.total_revenue, Some(1000.0));
    }

    #[test]
    fn test_peak_hour_tie_takes_smallest_hour() {
        let m = analyze(&sample_table());
        assert_eq!(m.peak_hour, Some(9));
    }

    #[test]
    fn test_date_series() {
        let m = analyze(&sample_table());
        let per_day = m.rides_per_day.unwrap();
        assert_eq!(per_day[&date("2024-03-15")], 2);
        assert_eq!(per_day.len(), 3);

        let per_month = m.rides_per_month.unwrap();
        assert_eq!(per_month["2024-03"], 3);
        assert_eq!(per_month["2024-04"], 1);

        let revenue = m.revenue_per_day.unwrap();
        assert_eq!(revenue[&date("2024-03-15")], 300.0);
    }

    #[test]
    fn test_weekday_series_in_calendar_order() {
        let m = analyze(&sample_table());
        let labels: Vec<String> = m
            .rides_per_day_of_week
            .unwrap()
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(labels, vec!["Monday", "Friday", "Saturday"]);
    }

    #[test]
    fn test_weekend_split_sums_to_total() {
        let m = analyze(&sample_table());
        assert_eq!(m.weekend_split_total(), Some(m.total_rides));
        let split = m.weekend_vs_weekday.unwrap();
        assert_eq!(split[0].label, "Weekday");
        assert_eq!(split[0].count, 3);
    }

    #[test]
    fn test_hour_series() {
        let m = analyze(&sample_table());
        let per_hour = m.rides_per_hour.unwrap();
        assert_eq!(per_hour[&9], 2);
        let fare_per_hour = m.avg_fare_per_hour.unwrap();
        assert_eq!(fare_per_hour[&18], 300.0);
    }

    #[test]
    fn test_categories() {
        let m = analyze(&sample_table());
        let types = m.ride_type_distribution.unwrap();
        assert_eq!(types[0].label, "Mini");
        assert_eq!(types[0].count, 2);
        // Sedan appears before Auto in the data
        assert_eq!(types[1].label, "Sedan");

        let pickups = m.top_pickup_locations.unwrap();
        assert_eq!(pickups[0].label, "Airport");
        assert_eq!(pickups[0].count, 2);

        let by_type = m.avg_fare_by_ride_type.unwrap();
        assert_eq!(by_type["Mini"], 200.0);
        let km_by_type = m.avg_distance_by_ride_type.unwrap();
        assert_eq!(km_by_type["Auto"], 40.0);

        let by_day = m.avg_fare_by_day_of_week.unwrap();
        assert_eq!(by_day[1].label, "Friday");
        assert_eq!(by_day[1].mean, 150.0);
    }

    #[test]
    fn test_longest_trips_descending_and_stable() {
        let mut table = sample_table();
        table.rides.push(ride("2024-04-02", 7, "Port", "Fort", 50.0, 40.0, "Auto"));
        let trips = analyze(&table).top_longest_trips.unwrap();
        assert_eq!(trips.len(), 5);
        assert_eq!(trips[0].fare, 400.0);
        assert_eq!(trips[1].pickup_location.as_deref(), Some("Port"));
        assert_eq!(trips[4].distance_km, 10.0);
    }

    #[test]
    fn test_correlation() {
        let m = analyze(&sample_table());
        let r = m.fare_distance_correlation.unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pickup_ride_type_pairs() {
        let pairs = analyze(&sample_table()).rides_by_pickup_ride_type.unwrap();
        assert_eq!(pairs[0].pickup_location, "Airport");
        assert_eq!(pairs[0].ride_type, "Mini");
        assert_eq!(pairs[0].count, 2);
        assert_eq!(pairs[1].pickup_location, "Mall");
    }

    #[test]
    fn test_describe() {
        let d = describe(&[10.0, 20.0, 20.0, 30.0]);
        assert_eq!(d.count, 4);
        assert_eq!(d.mean, Some(20.0));
        assert_eq!(d.min, Some(10.0));
        assert_eq!(d.p25, Some(17.5));
        assert_eq!(d.p50, Some(20.0));
        assert_eq!(d.max, Some(30.0));
        assert!((d.std.unwrap() - 8.164_965_809_277_26).abs() < 1e-9);
    }

    #[test]
    fn test_absent_columns_leave_entries_empty() {
        let table = RideTable {
            columns: [Field::Fare].into_iter().collect(),
            extra_columns: vec![],
            rides: vec![Ride {
                fare: Some(12.0),
                ..Default::default()
            }],
        };
        let m = analyze(&table);
        assert_eq!(m.total_rides, 1);
        assert_eq!(m.avg_fare, Some(12.0));
        assert!(m.peak_hour.is_none());
        assert!(m.rides_per_hour.is_none());
        assert!(m.rides_per_day.is_none());
        assert!(m.ride_type_distribution.is_none());
        assert!(m.fare_distance_correlation.is_none());
        assert!(m.top_longest_trips.is_none());
    }

    #[test]
    fn test_empty_table() {
        let table = RideTable {
            columns: full_columns(),
            ..Default::default()
        };
        let m = analyze(&table);
        assert_eq!(m.total_rides, 0);
        assert_eq!(m.avg_fare, None);
        assert_eq!(m.total_revenue, Some(0.0));
        assert_eq!(m.peak_hour, None);
        assert_eq!(m.weekend_split_total(), Some(0));
    }
}
