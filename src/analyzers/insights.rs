//! Human-readable one-line summaries of a dataset.
//!
//! Computed straight from the canonical table rather than from the
//! [`MetricsBundle`](crate::analyzers::types::MetricsBundle). Every "most
//! frequent" pick uses the same smallest-key tie-break as the bundle's
//! `peak_hour`, so the two never disagree.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::analyzers::utility::{argmax, mean, mode};
use crate::model::{Field, Ride, RideTable};

const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Insights {
    pub avg_fare: f64,
    pub peak_hour: Option<u32>,
    pub popular_ride_type: Option<String>,
    pub highest_revenue_day: Option<NaiveDate>,
    pub top_pickup: Option<String>,
    pub top_drop: Option<String>,
}

impl Insights {
    pub fn from_table(table: &RideTable) -> Self {
        let rides = &table.rides;
        let avg_fare = table
            .numbers(Field::Fare)
            .and_then(|fares| mean(&fares))
            .unwrap_or(0.0);

        let highest_revenue_day = if table.has(Field::RideDate) && table.has(Field::Fare) {
            let mut revenue: BTreeMap<NaiveDate, f64> = BTreeMap::new();
            for (day, fare) in rides.iter().filter_map(|r| Some((r.ride_date?, r.fare?))) {
                *revenue.entry(day).or_insert(0.0) += fare;
            }
            argmax(revenue)
        } else {
            None
        };

        Self {
            avg_fare,
            peak_hour: mode(rides.iter().filter_map(Ride::hour)),
            popular_ride_type: mode(rides.iter().filter_map(|r| r.ride_type.clone())),
            highest_revenue_day,
            top_pickup: mode(rides.iter().filter_map(|r| r.pickup_location.clone())),
            top_drop: mode(rides.iter().filter_map(|r| r.drop_location.clone())),
        }
    }

    /// The five fixed insight lines, in display order.
    pub fn lines(&self) -> Vec<String> {
        vec![
            format!("Average Fare: ₹{:.2}", self.avg_fare),
            format!("Peak Ride Hour: {}:00", or_na(self.peak_hour)),
            format!("Most Popular Ride Type: {}", or_na(self.popular_ride_type.as_ref())),
            format!(
                "Highest Revenue Day: {}",
                or_na(self.highest_revenue_day.map(|d| d.format("%Y-%m-%d")))
            ),
            format!(
                "Top Pickup: {} → Top Drop: {}",
                or_na(self.top_pickup.as_ref()),
                or_na(self.top_drop.as_ref())
            ),
        ]
    }
}

/// Renders a value, or `N/A` when absent.
pub fn or_na<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| NOT_AVAILABLE.to_string(), |v| v.to_string())
}
