//! Typed ride records.
//!
//! Every recognized column is optional. A [`RideTable`] records which
//! columns the input carried in its [`ColumnSet`], and each [`Ride`] holds
//! its values as `Option`s, so downstream code matches on presence instead
//! of probing a dynamic table by name.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};

/// Columns the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    RideId,
    RideDate,
    RideTime,
    PickupLocation,
    DropLocation,
    Fare,
    DistanceKm,
    DurationMins,
    RideType,
}

impl Field {
    /// Canonical column order used when writing a table back out.
    pub const ALL: [Field; 9] = [
        Field::RideId,
        Field::RideDate,
        Field::RideTime,
        Field::PickupLocation,
        Field::DropLocation,
        Field::Fare,
        Field::DistanceKm,
        Field::DurationMins,
        Field::RideType,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::RideId => "ride_id",
            Field::RideDate => "ride_date",
            Field::RideTime => "ride_time",
            Field::PickupLocation => "pickup_location",
            Field::DropLocation => "drop_location",
            Field::Fare => "fare",
            Field::DistanceKm => "distance_km",
            Field::DurationMins => "duration_mins",
            Field::RideType => "ride_type",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Whether cells of this column are compared and stored as numbers.
    pub fn is_numeric(self) -> bool {
        matches!(self, Field::Fare | Field::DistanceKm | Field::DurationMins)
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Columns recomputed from their sources; input columns with these names are ignored.
pub const DERIVED_COLUMNS: [&str; 4] = [
    "ride_date_display",
    "ride_time_display",
    "hour",
    "day_of_week",
];

/// Set of [`Field`]s present in a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnSet(u16);

impl ColumnSet {
    pub fn insert(&mut self, field: Field) {
        self.0 |= field.bit();
    }

    pub fn contains(self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    /// `hour` and `ride_time_display` exist whenever `ride_time` does.
    pub fn has_hour(self) -> bool {
        self.contains(Field::RideTime)
    }

    /// `day_of_week` and `ride_date_display` exist whenever `ride_date` does.
    pub fn has_day_of_week(self) -> bool {
        self.contains(Field::RideDate)
    }

    pub fn iter(self) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<Field> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        let mut set = ColumnSet::default();
        for field in iter {
            set.insert(field);
        }
        set
    }
}

/// One canonical ride.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ride {
    pub ride_id: Option<String>,
    pub ride_date: Option<NaiveDate>,
    pub ride_time: Option<NaiveTime>,
    pub pickup_location: Option<String>,
    pub drop_location: Option<String>,
    pub fare: Option<f64>,
    pub distance_km: Option<f64>,
    pub duration_mins: Option<f64>,
    pub ride_type: Option<String>,
    /// Values of unrecognized columns, aligned with [`RideTable::extra_columns`].
    pub extra: Vec<Option<String>>,
}

impl Ride {
    pub fn hour(&self) -> Option<u32> {
        self.ride_time.map(|t| t.hour())
    }

    pub fn ride_date_display(&self) -> Option<String> {
        self.ride_date.map(|d| d.format("%Y-%m-%d").to_string())
    }

    pub fn ride_time_display(&self) -> Option<String> {
        self.ride_time.map(|t| t.format("%H:%M:%S").to_string())
    }

    pub fn weekday(&self) -> Option<Weekday> {
        self.ride_date.map(|d| d.weekday())
    }

    /// Full English weekday name, e.g. `"Monday"`.
    pub fn day_of_week(&self) -> Option<&'static str> {
        self.weekday().map(weekday_name)
    }

    /// Text rendering of a recognized column, as written to CSV.
    pub fn cell(&self, field: Field) -> Option<String> {
        match field {
            Field::RideId => self.ride_id.clone(),
            Field::RideDate => self.ride_date_display(),
            Field::RideTime => self.ride_time_display(),
            Field::PickupLocation => self.pickup_location.clone(),
            Field::DropLocation => self.drop_location.clone(),
            Field::Fare => self.fare.map(|v| v.to_string()),
            Field::DistanceKm => self.distance_km.map(|v| v.to_string()),
            Field::DurationMins => self.duration_mins.map(|v| v.to_string()),
            Field::RideType => self.ride_type.clone(),
        }
    }
}

/// Full English name of a weekday.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

/// Hashable identity of one cell, used for exact-duplicate detection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum CellKey {
    Missing,
    Number(u64),
    Text(String),
}

impl CellKey {
    pub(crate) fn number(value: Option<f64>) -> Self {
        match value {
            // -0.0 and 0.0 compare equal
            Some(v) if v == 0.0 => CellKey::Number(0f64.to_bits()),
            Some(v) => CellKey::Number(v.to_bits()),
            None => CellKey::Missing,
        }
    }

    pub(crate) fn text(value: Option<&str>) -> Self {
        match value {
            Some(v) => CellKey::Text(v.to_string()),
            None => CellKey::Missing,
        }
    }
}

/// The canonical dataset: rides plus the schema they were read with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RideTable {
    pub columns: ColumnSet,
    pub extra_columns: Vec<String>,
    pub rides: Vec<Ride>,
}

impl RideTable {
    pub fn len(&self) -> usize {
        self.rides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rides.is_empty()
    }

    pub fn has(&self, field: Field) -> bool {
        self.columns.contains(field)
    }

    /// Names of every column the table exposes, derived columns included.
    pub fn column_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .columns
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        if self.columns.has_day_of_week() {
            names.push("ride_date_display".to_string());
        }
        if self.columns.has_hour() {
            names.push("hour".to_string());
            names.push("ride_time_display".to_string());
        }
        if self.columns.has_day_of_week() {
            names.push("day_of_week".to_string());
        }
        names.extend(self.extra_columns.iter().cloned());
        names
    }

    /// Values of a numeric column, or `None` when the column is absent.
    pub fn numbers(&self, field: Field) -> Option<Vec<f64>> {
        if !self.has(field) {
            return None;
        }
        let pick = |r: &Ride| match field {
            Field::Fare => r.fare,
            Field::DistanceKm => r.distance_km,
            Field::DurationMins => r.duration_mins,
            _ => None,
        };
        Some(self.rides.iter().filter_map(pick).collect())
    }

    /// Renders the table back into raw text rows, one cell per column of
    /// [`RideTable::column_names`].
    pub fn to_rows(&self) -> Vec<Vec<Option<String>>> {
        self.rides
            .iter()
            .map(|ride| {
                let mut row: Vec<Option<String>> =
                    self.columns.iter().map(|f| ride.cell(f)).collect();
                if self.columns.has_day_of_week() {
                    row.push(ride.ride_date_display());
                }
                if self.columns.has_hour() {
                    row.push(ride.hour().map(|h| h.to_string()));
                    row.push(ride.ride_time_display());
                }
                if self.columns.has_day_of_week() {
                    row.push(ride.day_of_week().map(str::to_string));
                }
                row.extend(ride.extra.iter().cloned());
                row
            })
            .collect()
    }
}
