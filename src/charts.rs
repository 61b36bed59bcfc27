//! PNG charts rendered from the canonical table and its metrics.
//!
//! Each [`ChartKind`] maps to one file in the plots directory. A chart whose
//! input series is absent or empty is skipped rather than drawn blank.

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use tracing::{debug, info};

use crate::analyzers::MetricsBundle;
use crate::analyzers::types::LabelCount;
use crate::analyzers::utility::pearson;
use crate::error::{RideError, Result};
use crate::model::{Field, Ride, RideTable};

type DrawResult<T> = std::result::Result<T, Box<dyn Error>>;
type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

const ACCENT: RGBColor = RGBColor(199, 21, 133);
const ORANGE: RGBColor = RGBColor(255, 165, 0);
const FOREST: RGBColor = RGBColor(34, 139, 34);
const PURPLE: RGBColor = RGBColor(128, 0, 128);
const CRIMSON: RGBColor = RGBColor(220, 20, 60);
const NAVY: RGBColor = RGBColor(31, 119, 180);
const PALETTE: [RGBColor; 8] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

const HISTOGRAM_BINS: usize = 20;
const FONT: &str = "sans-serif";

/// The charts the report knows about, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    RidesPerDay,
    RidesPerHour,
    RideTypeDistribution,
    Histograms,
    RevenuePerDay,
    FareVsDistance,
    CorrelationHeatmap,
    TopLocations,
}

impl ChartKind {
    pub const ALL: [ChartKind; 8] = [
        ChartKind::RidesPerDay,
        ChartKind::RidesPerHour,
        ChartKind::RideTypeDistribution,
        ChartKind::Histograms,
        ChartKind::RevenuePerDay,
        ChartKind::FareVsDistance,
        ChartKind::CorrelationHeatmap,
        ChartKind::TopLocations,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            ChartKind::RidesPerDay => "rides_per_day.png",
            ChartKind::RidesPerHour => "rides_per_hour.png",
            ChartKind::RideTypeDistribution => "ride_type_distribution.png",
            ChartKind::Histograms => "histograms.png",
            ChartKind::RevenuePerDay => "revenue_per_day.png",
            ChartKind::FareVsDistance => "fare_vs_distance.png",
            ChartKind::CorrelationHeatmap => "correlation_heatmap.png",
            ChartKind::TopLocations => "top_locations.png",
        }
    }

    fn size(self) -> (u32, u32) {
        match self {
            ChartKind::RidesPerDay | ChartKind::RidesPerHour | ChartKind::RevenuePerDay => {
                (800, 400)
            }
            ChartKind::Histograms | ChartKind::TopLocations => (1200, 500),
            ChartKind::RideTypeDistribution => (640, 480),
            ChartKind::FareVsDistance => (700, 500),
            ChartKind::CorrelationHeatmap => (500, 400),
        }
    }
}

/// A chart written to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartArtifact {
    pub kind: ChartKind,
    pub path: PathBuf,
}

/// Renders every chart that has data into `dir`, creating it if needed.
///
/// A skipped chart's file is removed so `dir` never holds a chart drawn
/// from another table.
#[tracing::instrument(skip_all, fields(dir = %dir.display()))]
pub fn render_charts(
    table: &RideTable,
    metrics: &MetricsBundle,
    dir: &Path,
) -> Result<Vec<ChartArtifact>> {
    fs::create_dir_all(dir)?;

    let mut artifacts = Vec::new();
    for kind in ChartKind::ALL {
        let path = dir.join(kind.file_name());
        let drawn = draw(kind, table, metrics, &path).map_err(|e| RideError::Chart {
            chart: kind.file_name(),
            message: e.to_string(),
        })?;
        if drawn {
            artifacts.push(ChartArtifact { kind, path });
        } else {
            debug!(chart = kind.file_name(), "No data for chart, skipped");
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
    }

    info!(charts = artifacts.len(), "Charts rendered");
    Ok(artifacts)
}

fn draw(kind: ChartKind, table: &RideTable, metrics: &MetricsBundle, path: &Path) -> DrawResult<bool> {
    let series = match kind {
        ChartKind::RidesPerDay => metrics.rides_per_day.as_ref().map(|days| {
            days.iter()
                .map(|(d, n)| (d.format("%Y-%m-%d").to_string(), *n as f64))
                .collect::<Vec<_>>()
        }),
        ChartKind::RevenuePerDay => metrics.revenue_per_day.as_ref().map(|days| {
            days.iter()
                .map(|(d, v)| (d.format("%Y-%m-%d").to_string(), *v))
                .collect::<Vec<_>>()
        }),
        _ => None,
    };

    let root = || canvas(path, kind.size());

    match kind {
        ChartKind::RidesPerDay | ChartKind::RevenuePerDay => {
            let Some(points) = series.filter(|p| !p.is_empty()) else {
                return Ok(false);
            };
            let (title, y_desc, color) = if kind == ChartKind::RidesPerDay {
                ("Rides per Day", "No. of Rides", ACCENT)
            } else {
                ("Revenue Per Day", "Total Revenue (Rs.)", CRIMSON)
            };
            let area = root()?;
            draw_line(&area, title, "Date", y_desc, &points, color)?;
            area.present()?;
        }
        ChartKind::RidesPerHour => {
            let Some(hours) = metrics.rides_per_hour.as_ref().filter(|h| !h.is_empty()) else {
                return Ok(false);
            };
            let labels: Vec<String> = hours.keys().map(u32::to_string).collect();
            let values: Vec<usize> = hours.values().copied().collect();
            let area = root()?;
            let bars = Bars {
                title: "Hourly Ride Distribution",
                x_desc: "Hour",
                y_desc: "Number of Rides",
                labels: &labels,
                values: &values,
                color: ORANGE,
            };
            bars.draw(&area)?;
            area.present()?;
        }
        ChartKind::RideTypeDistribution => {
            let Some(types) = metrics
                .ride_type_distribution
                .as_ref()
                .filter(|t| !t.is_empty())
            else {
                return Ok(false);
            };
            let area = root()?;
            draw_pie(&area, "Ride Type Distribution", types)?;
            area.present()?;
        }
        ChartKind::Histograms => {
            let (Some(fares), Some(distances)) =
                (table.numbers(Field::Fare), table.numbers(Field::DistanceKm))
            else {
                return Ok(false);
            };
            if fares.is_empty() {
                return Ok(false);
            }
            let area = root()?;
            let (left, right) = area.split_horizontally(600);
            draw_histogram(&left, "Fare Distribution", "fare", &fares, FOREST)?;
            draw_histogram(&right, "Distance Distribution", "distance_km", &distances, PURPLE)?;
            area.present()?;
        }
        ChartKind::FareVsDistance => {
            let points: Vec<(f64, f64)> = table
                .rides
                .iter()
                .filter_map(|r| Some((r.distance_km?, r.fare?)))
                .collect();
            if points.is_empty() {
                return Ok(false);
            }
            let area = root()?;
            draw_scatter(&area, &points)?;
            area.present()?;
        }
        ChartKind::CorrelationHeatmap => {
            let matrix = correlation_matrix(table);
            if matrix.names.len() < 2 || table.len() < 2 {
                return Ok(false);
            }
            let area = root()?;
            draw_heatmap(&area, &matrix)?;
            area.present()?;
        }
        ChartKind::TopLocations => {
            let (Some(pickups), Some(drops)) = (
                metrics.top_pickup_locations.as_ref(),
                metrics.top_drop_locations.as_ref(),
            ) else {
                return Ok(false);
            };
            if pickups.is_empty() && drops.is_empty() {
                return Ok(false);
            }
            let area = root()?;
            let (left, right) = area.split_horizontally(600);
            draw_label_counts(&left, "Top Pickup Locations", pickups, NAVY)?;
            draw_label_counts(&right, "Top Drop Locations", drops, FOREST)?;
            area.present()?;
        }
    }
    Ok(true)
}

fn canvas(path: &Path, size: (u32, u32)) -> DrawResult<Area<'_>> {
    let area = BitMapBackend::new(path, size).into_drawing_area();
    area.fill(&WHITE)?;
    Ok(area)
}

fn draw_line(
    area: &Area<'_>,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    points: &[(String, f64)],
    color: RGBColor,
) -> DrawResult<()> {
    let n = points.len();
    let y_max = points.iter().map(|p| p.1).fold(0.0, f64::max).max(1.0) * 1.1;

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, 24))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)?;

    let label_at = |x: &f64| {
        let idx = x.round();
        if (x - idx).abs() > 1e-6 || idx < 0.0 {
            return String::new();
        }
        points
            .get(idx as usize)
            .map(|p| p.0.clone())
            .unwrap_or_default()
    };
    chart
        .configure_mesh()
        .x_labels(n.min(8))
        .x_label_formatter(&label_at)
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(LineSeries::new(
        points.iter().enumerate().map(|(i, p)| (i as f64, p.1)),
        &color,
    ))?;
    chart.draw_series(
        points
            .iter()
            .enumerate()
            .map(|(i, p)| Circle::new((i as f64, p.1), 3, color.filled())),
    )?;
    Ok(())
}

/// A categorical bar chart.
struct Bars<'a> {
    title: &'a str,
    x_desc: &'a str,
    y_desc: &'a str,
    labels: &'a [String],
    values: &'a [usize],
    color: RGBColor,
}

impl Bars<'_> {
    fn draw(&self, area: &Area<'_>) -> DrawResult<()> {
        let n = self.values.len().max(1) as u32;
        let y_max = self.values.iter().copied().max().unwrap_or(0) + 1;

        let mut chart = ChartBuilder::on(area)
            .caption(self.title, (FONT, 22))
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(50)
            .build_cartesian_2d((0u32..n).into_segmented(), 0usize..y_max)?;

        let label_at = |x: &SegmentValue<u32>| match x {
            SegmentValue::CenterOf(i) => self.labels.get(*i as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(self.labels.len())
            .x_label_formatter(&label_at)
            .x_desc(self.x_desc)
            .y_desc(self.y_desc)
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(self.color.filled())
                .margin(4)
                .data(self.values.iter().enumerate().map(|(i, v)| (i as u32, *v))),
        )?;
        Ok(())
    }
}

fn draw_label_counts(
    area: &Area<'_>,
    title: &str,
    counts: &[LabelCount],
    color: RGBColor,
) -> DrawResult<()> {
    let labels: Vec<String> = counts.iter().map(|c| c.label.clone()).collect();
    let values: Vec<usize> = counts.iter().map(|c| c.count).collect();
    Bars {
        title,
        x_desc: "",
        y_desc: "count",
        labels: &labels,
        values: &values,
        color,
    }
    .draw(area)
}

fn draw_histogram(
    area: &Area<'_>,
    title: &str,
    x_desc: &str,
    values: &[f64],
    color: RGBColor,
) -> DrawResult<()> {
    let bins = histogram_bins(values, HISTOGRAM_BINS);
    let labels: Vec<String> = bins.iter().map(|(start, _)| format!("{start:.0}")).collect();
    let counts: Vec<usize> = bins.iter().map(|(_, c)| *c).collect();
    Bars {
        title,
        x_desc,
        y_desc: "Count",
        labels: &labels,
        values: &counts,
        color,
    }
    .draw(area)
}

/// Splits the value range into `bins` equal-width bins, returning each
/// bin's lower edge and count. The maximum lands in the last bin.
pub fn histogram_bins(values: &[f64], bins: usize) -> Vec<(f64, usize)> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = if max > min {
        (max - min) / bins as f64
    } else {
        1.0
    };

    let mut counts = vec![0usize; bins];
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (min + width * i as f64, c))
        .collect()
}

fn draw_pie(area: &Area<'_>, title: &str, types: &[LabelCount]) -> DrawResult<()> {
    let area = area.titled(title, (FONT, 24))?;
    let (w, h) = area.dim_in_pixel();
    let center = (w as i32 / 2, h as i32 / 2);
    let radius = f64::from(w.min(h)) * 0.38;

    let sizes: Vec<f64> = types.iter().map(|t| t.count as f64).collect();
    let colors: Vec<RGBColor> = (0..types.len()).map(|i| PALETTE[i % PALETTE.len()]).collect();
    let labels: Vec<String> = types.iter().map(|t| t.label.clone()).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style((FONT, 16).into_font().color(&BLACK));
    pie.percentages((FONT, 14).into_font().color(&WHITE));
    area.draw(&pie)?;
    Ok(())
}

fn draw_scatter(area: &Area<'_>, points: &[(f64, f64)]) -> DrawResult<()> {
    let x_max = points.iter().map(|p| p.0).fold(0.0, f64::max).max(1.0) * 1.05;
    let y_max = points.iter().map(|p| p.1).fold(0.0, f64::max).max(1.0) * 1.05;

    let mut chart = ChartBuilder::on(area)
        .caption("Fare vs Distance", (FONT, 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0f64..x_max, 0f64..y_max)?;
    chart
        .configure_mesh()
        .x_desc("distance_km")
        .y_desc("fare")
        .draw()?;

    chart.draw_series(points.iter().map(|&(d, f)| {
        let color = ramp(f / y_max);
        Circle::new((d, f), 4, color.filled())
    }))?;
    Ok(())
}

/// Pairwise Pearson correlations over the numeric ride columns present.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub names: Vec<&'static str>,
    pub values: Vec<Vec<Option<f64>>>,
}

pub fn correlation_matrix(table: &RideTable) -> CorrelationMatrix {
    let present: Vec<Field> = [Field::Fare, Field::DistanceKm, Field::DurationMins]
        .into_iter()
        .filter(|f| table.has(*f))
        .collect();

    let values = present
        .iter()
        .map(|&a| {
            present
                .iter()
                .map(|&b| {
                    let (xs, ys): (Vec<f64>, Vec<f64>) = table
                        .rides
                        .iter()
                        .filter_map(|r| Some((number(r, a)?, number(r, b)?)))
                        .unzip();
                    pearson(&xs, &ys)
                })
                .collect()
        })
        .collect();

    CorrelationMatrix {
        names: present.iter().map(|f| f.name()).collect(),
        values,
    }
}

fn number(ride: &Ride, field: Field) -> Option<f64> {
    match field {
        Field::Fare => ride.fare,
        Field::DistanceKm => ride.distance_km,
        Field::DurationMins => ride.duration_mins,
        _ => None,
    }
}

fn draw_heatmap(area: &Area<'_>, matrix: &CorrelationMatrix) -> DrawResult<()> {
    let n = matrix.names.len() as u32;
    let mut chart = ChartBuilder::on(area)
        .caption("Correlation Heatmap", (FONT, 22))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(90)
        .build_cartesian_2d((0u32..n).into_segmented(), (0u32..n).into_segmented())?;

    // row 0 is drawn at the top
    let row_of = |y: u32| n - 1 - y;
    let x_label = |x: &SegmentValue<u32>| match x {
        SegmentValue::CenterOf(i) => matrix.names.get(*i as usize).map(|s| s.to_string()).unwrap_or_default(),
        _ => String::new(),
    };
    let y_label = |y: &SegmentValue<u32>| match y {
        SegmentValue::CenterOf(i) if *i < n => matrix.names[row_of(*i) as usize].to_string(),
        _ => String::new(),
    };
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n as usize)
        .y_labels(n as usize)
        .x_label_formatter(&x_label)
        .y_label_formatter(&y_label)
        .draw()?;

    for (i, row) in matrix.values.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            let (x, y) = (j as u32, row_of(i as u32));
            let fill = value.map_or(RGBColor(200, 200, 200), coolwarm);
            chart.draw_series(std::iter::once(Rectangle::new(
                [
                    (SegmentValue::Exact(x), SegmentValue::Exact(y)),
                    (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1)),
                ],
                fill.filled(),
            )))?;
            let text = value.map_or_else(|| "nan".to_string(), |v| format!("{v:.2}"));
            chart.draw_series(std::iter::once(Text::new(
                text,
                (SegmentValue::CenterOf(x), SegmentValue::CenterOf(y)),
                (FONT, 16).into_font().color(&BLACK),
            )))?;
        }
    }
    Ok(())
}

/// Diverging blue-white-red colour for a correlation in [-1, 1].
fn coolwarm(r: f64) -> RGBColor {
    let blue = (59.0, 76.0, 192.0);
    let mid = (221.0, 221.0, 221.0);
    let red = (180.0, 4.0, 38.0);
    let t = r.clamp(-1.0, 1.0);
    let (from, to, k) = if t < 0.0 { (mid, blue, -t) } else { (mid, red, t) };
    let lerp = |a: f64, b: f64| (a + (b - a) * k).round() as u8;
    RGBColor(lerp(from.0, to.0), lerp(from.1, to.1), lerp(from.2, to.2))
}

/// Sequential colour for a fraction in [0, 1].
fn ramp(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let lerp = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    RGBColor(lerp(68.0, 253.0), lerp(1.0, 231.0), lerp(84.0, 37.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::analyze;
    use std::env;

    fn table() -> RideTable {
        RideTable {
            columns: [Field::Fare, Field::DistanceKm, Field::DurationMins]
                .into_iter()
                .collect(),
            extra_columns: vec![],
            rides: (1..=4)
                .map(|i| Ride {
                    fare: Some(i as f64 * 10.0),
                    distance_km: Some(i as f64),
                    duration_mins: Some(10.0 - i as f64),
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[test]
    fn test_chart_kinds_in_report_order() {
        assert_eq!(ChartKind::ALL.len(), 8);
        assert_eq!(ChartKind::ALL[0].file_name(), "rides_per_day.png");
        assert_eq!(ChartKind::ALL[7].file_name(), "top_locations.png");
    }

    #[test]
    fn test_histogram_bins() {
        let bins = histogram_bins(&[0.0, 1.0, 2.0, 10.0], 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[0], (0.0, 2));
        assert_eq!(bins[1], (2.0, 1));
        assert_eq!(bins[4], (8.0, 1));
        assert!(histogram_bins(&[], 5).is_empty());
    }

    #[test]
    fn test_histogram_single_value() {
        let bins = histogram_bins(&[7.0, 7.0], 3);
        assert_eq!(bins[0], (7.0, 2));
    }

    #[test]
    fn test_correlation_matrix() {
        let matrix = correlation_matrix(&table());
        assert_eq!(matrix.names, vec!["fare", "distance_km", "duration_mins"]);
        let fare_km = matrix.values[0][1].unwrap();
        let fare_duration = matrix.values[0][2].unwrap();
        assert!((fare_km - 1.0).abs() < 1e-12);
        assert!((fare_duration + 1.0).abs() < 1e-12);
        assert!((matrix.values[2][2].unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_coolwarm_ends() {
        assert_eq!(coolwarm(-1.0), RGBColor(59, 76, 192));
        assert_eq!(coolwarm(0.0), RGBColor(221, 221, 221));
        assert_eq!(coolwarm(1.0), RGBColor(180, 4, 38));
    }

    #[test]
    fn test_render_skips_charts_without_data() {
        let dir = env::temp_dir().join("rideiq_test_charts_empty");
        let table = RideTable::default();
        let metrics = analyze(&table);

        let artifacts = render_charts(&table, &metrics, &dir).unwrap();

        assert!(artifacts.is_empty());
        assert!(dir.is_dir());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_render_writes_files_it_reports() {
        let dir = env::temp_dir().join("rideiq_test_charts_full");
        let table = table();
        let metrics = analyze(&table);

        let artifacts = render_charts(&table, &metrics, &dir).unwrap();

        let kinds: Vec<ChartKind> = artifacts.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ChartKind::Histograms,
                ChartKind::FareVsDistance,
                ChartKind::CorrelationHeatmap
            ]
        );
        for artifact in &artifacts {
            assert!(artifact.path.exists());
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_render_removes_skipped_chart_files() {
        let dir = env::temp_dir().join("rideiq_test_charts_stale");
        fs::create_dir_all(&dir).unwrap();
        let stale = dir.join(ChartKind::RidesPerHour.file_name());
        fs::write(&stale, b"old chart").unwrap();
        let table = table();
        let metrics = analyze(&table);

        render_charts(&table, &metrics, &dir).unwrap();

        assert!(!stale.exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
