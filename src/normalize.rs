//! Cleans a [`RawTable`] into the canonical [`RideTable`].
//!
//! Steps run in a fixed order, each only when its column is present:
//! dedupe, impute, parse dates, parse times, tidy locations, positivity
//! filter, outlier filter, weekday derivation. Imputation runs before the
//! filters, so an out-of-range median removes the rows it was written into.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use crate::ingest::{RawTable, parse_number};
use crate::model::{ColumnSet, DERIVED_COLUMNS, Field, Ride, RideTable};

/// Exclusive upper bound on a plausible fare.
pub const MAX_FARE: f64 = 10_000.0;
/// Exclusive upper bound on a plausible trip length in kilometres.
pub const MAX_DISTANCE_KM: f64 = 500.0;
/// Ride type written into rows that have none.
pub const UNKNOWN_RIDE_TYPE: &str = "Unknown";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Normalizes against the local calendar date.
pub fn normalize(raw: RawTable) -> RideTable {
    normalize_as_of(raw, Local::now().date_naive())
}

/// Normalizes treating `today` as the latest acceptable ride date.
#[tracing::instrument(skip_all, fields(rows_in = raw.len(), today = %today))]
pub fn normalize_as_of(mut raw: RawTable, today: NaiveDate) -> RideTable {
    // 1. exact duplicates
    let duplicates = raw.dedupe();

    let schema = Schema::of(&raw);
    let mut rides: Vec<Ride> = raw.rows.iter().map(|row| schema.typed(row)).collect();
    let columns = schema.columns;
    let mut dropped = DropCounts {
        duplicates,
        ..Default::default()
    };

    // 2. imputation
    if columns.contains(Field::Fare) {
        let present: Vec<f64> = rides.iter().filter_map(|r| r.fare).collect();
        if let Some(median) = crate::analyzers::utility::median(&present) {
            for ride in rides.iter_mut().filter(|r| r.fare.is_none()) {
                ride.fare = Some(median);
            }
        }
    }
    if columns.contains(Field::DistanceKm) {
        for ride in &mut rides {
            ride.distance_km.get_or_insert(0.0);
        }
    }
    if columns.contains(Field::RideType) {
        for ride in &mut rides {
            ride.ride_type.get_or_insert_with(|| UNKNOWN_RIDE_TYPE.to_string());
        }
    }

    // 3-4. dates and times; unparseable or future rows go
    if columns.contains(Field::RideDate) {
        dropped.bad_dates = retain_counting(&mut rides, |r| r.ride_date.is_some_and(|d| d <= today));
    }
    if columns.contains(Field::RideTime) {
        dropped.bad_times = retain_counting(&mut rides, |r| r.ride_time.is_some());
    }

    // 5. locations
    for ride in &mut rides {
        for location in [&mut ride.pickup_location, &mut ride.drop_location] {
            if let Some(text) = location {
                *text = title_case(text.trim());
            }
        }
    }

    // 6-7. positivity and outlier bounds
    if columns.contains(Field::Fare) {
        dropped.non_positive += retain_counting(&mut rides, |r| r.fare.is_some_and(|v| v > 0.0));
    }
    if columns.contains(Field::DistanceKm) {
        dropped.non_positive +=
            retain_counting(&mut rides, |r| r.distance_km.is_some_and(|v| v > 0.0));
    }
    if columns.contains(Field::Fare) {
        dropped.outliers += retain_counting(&mut rides, |r| r.fare.is_some_and(|v| v < MAX_FARE));
    }
    if columns.contains(Field::DistanceKm) {
        dropped.outliers +=
            retain_counting(&mut rides, |r| r.distance_km.is_some_and(|v| v < MAX_DISTANCE_KM));
    }

    // 8. day_of_week is derived from ride_date on access

    debug!(
        duplicates = dropped.duplicates,
        bad_dates = dropped.bad_dates,
        bad_times = dropped.bad_times,
        non_positive = dropped.non_positive,
        outliers = dropped.outliers,
        rows_out = rides.len(),
        "Normalization finished"
    );

    RideTable {
        columns,
        extra_columns: schema.extra_names,
        rides,
    }
}

#[derive(Debug, Default)]
struct DropCounts {
    duplicates: usize,
    bad_dates: usize,
    bad_times: usize,
    non_positive: usize,
    outliers: usize,
}

fn retain_counting<F: FnMut(&Ride) -> bool>(rides: &mut Vec<Ride>, mut keep: F) -> usize {
    let before = rides.len();
    rides.retain(|r| keep(r));
    before - rides.len()
}

/// Maps raw header positions onto typed fields.
struct Schema {
    columns: ColumnSet,
    fields: Vec<(Field, usize)>,
    extra: Vec<usize>,
    extra_names: Vec<String>,
}

impl Schema {
    fn of(raw: &RawTable) -> Self {
        let mut columns = ColumnSet::default();
        let mut fields = Vec::new();
        let mut extra = Vec::new();
        let mut extra_names = Vec::new();

        for (idx, name) in raw.headers.iter().enumerate() {
            match Field::from_name(name) {
                Some(field) if !columns.contains(field) => {
                    columns.insert(field);
                    fields.push((field, idx));
                }
                Some(_) => {}
                None if DERIVED_COLUMNS.contains(&name.as_str()) => {}
                None => {
                    extra.push(idx);
                    extra_names.push(name.clone());
                }
            }
        }

        Self {
            columns,
            fields,
            extra,
            extra_names,
        }
    }

    fn typed(&self, row: &[Option<String>]) -> Ride {
        let mut ride = Ride {
            extra: self.extra.iter().map(|&i| row.get(i).cloned().flatten()).collect(),
            ..Default::default()
        };
        for &(field, idx) in &self.fields {
            let Some(text) = row.get(idx).and_then(|cell| cell.as_deref()) else {
                continue;
            };
            match field {
                Field::RideId => ride.ride_id = Some(text.to_string()),
                Field::RideDate => ride.ride_date = parse_date(text),
                Field::RideTime => ride.ride_time = parse_time(text),
                Field::PickupLocation => ride.pickup_location = Some(text.to_string()),
                Field::DropLocation => ride.drop_location = Some(text.to_string()),
                Field::Fare => ride.fare = parse_number(text),
                Field::DistanceKm => ride.distance_km = parse_number(text),
                Field::DurationMins => ride.duration_mins = parse_number(text),
                Field::RideType => ride.ride_type = Some(text.to_string()),
            }
        }
        ride
    }
}

/// Parses a calendar date from the accepted date or datetime spellings,
/// discarding any time of day.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Parses a strict `HH:MM:SS` time of day.
pub fn parse_time(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S").ok()
}

/// Title-cases text: the first letter of every run of letters is upper
/// case, the rest lower case.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}
