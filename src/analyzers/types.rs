//! Result types produced by the metrics engine.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// A category label and how many rides carry it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: usize,
}

/// A category label and a mean value over its rides.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelMean {
    pub label: String,
    pub mean: f64,
}

/// A (pickup location, ride type) pair and its ride count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairCount {
    pub pickup_location: String,
    pub ride_type: String,
    pub count: usize,
}

/// Count, mean, sample standard deviation, min, quartiles and max.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub p25: Option<f64>,
    #[serde(rename = "50%")]
    pub p50: Option<f64>,
    #[serde(rename = "75%")]
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

/// One of the longest trips in the dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongTrip {
    pub ride_date: NaiveDate,
    pub pickup_location: Option<String>,
    pub drop_location: Option<String>,
    pub distance_km: f64,
    pub fare: f64,
}

/// The fixed set of named results computed over a canonical table.
///
/// Every entry except `total_rides` is absent when the columns it depends
/// on are missing; consumers must treat them as optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricsBundle {
    // scalars
    pub total_rides: usize,
    pub avg_fare: Option<f64>,
    pub max_fare: Option<f64>,
    pub min_fare: Option<f64>,
    pub avg_distance: Option<f64>,
    pub total_revenue: Option<f64>,
    pub peak_hour: Option<u32>,

    // trends
    pub rides_per_day: Option<BTreeMap<NaiveDate, usize>>,
    pub rides_per_month: Option<BTreeMap<String, usize>>,
    pub rides_per_day_of_week: Option<Vec<LabelCount>>,
    pub weekend_vs_weekday: Option<Vec<LabelCount>>,
    pub rides_per_hour: Option<BTreeMap<u32, usize>>,
    pub avg_fare_per_hour: Option<BTreeMap<u32, f64>>,

    // categories and locations
    pub ride_type_distribution: Option<Vec<LabelCount>>,
    pub top_pickup_locations: Option<Vec<LabelCount>>,
    pub top_drop_locations: Option<Vec<LabelCount>>,

    // fares and distances
    pub fare_stats: Option<Describe>,
    pub distance_stats: Option<Describe>,
    pub avg_fare_by_ride_type: Option<BTreeMap<String, f64>>,
    pub avg_fare_by_day_of_week: Option<Vec<LabelMean>>,
    pub avg_distance_by_ride_type: Option<BTreeMap<String, f64>>,
    pub avg_distance_by_day_of_week: Option<Vec<LabelMean>>,
    pub top_longest_trips: Option<Vec<LongTrip>>,

    // combined
    pub fare_distance_correlation: Option<f64>,
    pub revenue_per_day: Option<BTreeMap<NaiveDate, f64>>,
    pub rides_by_pickup_ride_type: Option<Vec<PairCount>>,
}

impl MetricsBundle {
    /// Sum of the weekend/weekday split, if computed.
    pub fn weekend_split_total(&self) -> Option<usize> {
        self.weekend_vs_weekday
            .as_ref()
            .map(|split| split.iter().map(|c| c.count).sum())
    }
}
