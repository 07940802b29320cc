use std::path::Path;
use std::str::FromStr;

use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::Palette;

use crate::error::DashboardError;
use crate::stats::{self, GroupSum};
use crate::table::Table;

/// Bar chart shows the first N rows of the chosen column, in table order.
pub const BAR_ROW_LIMIT: usize = 20;

/// Line chart shows the first N rows of the chosen column, in table order.
pub const LINE_ROW_LIMIT: usize = 50;

/// Histogram bin count over the column's observed range.
pub const HISTOGRAM_BINS: usize = 20;

const CHART_WIDTH: u32 = 800;
const CHART_HEIGHT: u32 = 500;

/// The four chart panels of the dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Bar,
    Line,
    Histogram,
    Pie,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Histogram => "histogram",
            ChartKind::Pie => "pie",
        }
    }
}

impl FromStr for ChartKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bar" => Ok(ChartKind::Bar),
            "line" => Ok(ChartKind::Line),
            "histogram" => Ok(ChartKind::Histogram),
            "pie" => Ok(ChartKind::Pie),
            other => Err(DashboardError::Render(format!(
                "unknown chart kind: {other}"
            ))),
        }
    }
}

fn render_err<E: std::fmt::Display>(e: E) -> DashboardError {
    DashboardError::Render(e.to_string())
}

/// Render through a temp-file bitmap backend and read the PNG back, the same
/// technique the file-based plotters backend requires for in-memory output.
fn with_temp_png(
    draw: impl FnOnce(&Path) -> Result<(), DashboardError>,
) -> Result<Vec<u8>, DashboardError> {
    let file = tempfile::Builder::new().suffix(".png").tempfile()?;
    draw(file.path())?;
    Ok(std::fs::read(file.path())?)
}

/// Bar chart: one bar per row for the first [`BAR_ROW_LIMIT`] rows, colored
/// by value magnitude. Missing cells leave a gap.
pub fn bar_chart(table: &Table, column: &str) -> Result<Vec<u8>, DashboardError> {
    let points = leading_points(table, column, BAR_ROW_LIMIT)?;
    let (min_v, max_v) = value_bounds(&points);
    let title = format!("{} - Top {} Values", column, BAR_ROW_LIMIT);
    let n = points.last().map(|&(i, _)| i + 1).unwrap_or(1);

    with_temp_png(|path| {
        let root = BitMapBackend::new(path, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let y_lo = min_v.min(0.0);
        let y_hi = padded_upper(max_v.max(0.0), y_lo);

        let mut chart = ChartBuilder::on(&root)
            .caption(&title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..n as f64, y_lo..y_hi)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_desc("Row")
            .y_desc(column)
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(points.iter().map(|&(i, v)| {
                let color = magnitude_color(v, min_v, max_v);
                Rectangle::new([(i as f64 + 0.1, 0.0), (i as f64 + 0.9, v)], color.filled())
            }))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        Ok(())
    })
}

/// Line chart: the first [`LINE_ROW_LIMIT`] rows as a connected series with
/// visible point markers.
pub fn line_chart(table: &Table, column: &str) -> Result<Vec<u8>, DashboardError> {
    let points = leading_points(table, column, LINE_ROW_LIMIT)?;
    let (min_v, max_v) = value_bounds(&points);
    let title = format!("{} - Trend Analysis", column);
    let n = points.last().map(|&(i, _)| i + 1).unwrap_or(1);

    with_temp_png(|path| {
        let root = BitMapBackend::new(path, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let y_lo = padded_lower(min_v, max_v);
        let y_hi = padded_upper(max_v, min_v);

        let mut chart = ChartBuilder::on(&root)
            .caption(&title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..n as f64, y_lo..y_hi)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_desc("Row")
            .y_desc(column)
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(LineSeries::new(
                points.iter().map(|&(i, v)| (i as f64, v)),
                &BLUE,
            ))
            .map_err(render_err)?;

        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(i, v)| Circle::new((i as f64, v), 3, BLUE.filled())),
            )
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        Ok(())
    })
}

/// Histogram: the entire column (no row cap) in [`HISTOGRAM_BINS`] fixed
/// width bins spanning the observed range.
pub fn histogram(table: &Table, column: &str) -> Result<Vec<u8>, DashboardError> {
    let values = table.numeric_values(column)?;
    if values.is_empty() {
        return Err(DashboardError::EmptyColumn(column.to_string()));
    }
    let (counts, min_v, max_v) = histogram_bins(&values, HISTOGRAM_BINS);
    let title = format!("{} - Distribution", column);

    with_temp_png(|path| {
        let root = BitMapBackend::new(path, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        // Degenerate range still gets a visible bar.
        let (x_lo, x_hi) = if min_v == max_v {
            (min_v - 0.5, max_v + 0.5)
        } else {
            (min_v, max_v)
        };
        let max_count = counts.iter().copied().max().unwrap_or(1).max(1);

        let mut chart = ChartBuilder::on(&root)
            .caption(&title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x_lo..x_hi, 0f64..max_count as f64 * 1.05)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_desc(column)
            .y_desc("Count")
            .draw()
            .map_err(render_err)?;

        let width = (x_hi - x_lo) / counts.len() as f64;
        chart
            .draw_series(counts.iter().enumerate().map(|(i, &count)| {
                let left = x_lo + i as f64 * width;
                Rectangle::new([(left, 0.0), (left + width, count as f64)], BLUE.filled())
            }))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        Ok(())
    })
}

/// Pie chart: one slice per group from the top-10 grouped sums.
pub fn pie_chart(table: &Table, category: &str, value: &str) -> Result<Vec<u8>, DashboardError> {
    let groups = stats::top_groups(table, category, value, stats::PIE_GROUP_LIMIT)?;
    let (sizes, labels) = pie_slices(&groups);
    if sizes.is_empty() {
        return Err(DashboardError::EmptyColumn(value.to_string()));
    }
    let title = format!("{} by {}", value, category);

    let colors: Vec<RGBColor> = (0..sizes.len())
        .map(|i| {
            let (r, g, b) = Palette99::COLORS[i % Palette99::COLORS.len()];
            RGBColor(r, g, b)
        })
        .collect();

    with_temp_png(|path| {
        let root = BitMapBackend::new(path, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        let root = root
            .titled(&title, ("sans-serif", 30).into_font())
            .map_err(render_err)?;

        let center = (CHART_WIDTH as i32 / 2, (CHART_HEIGHT as i32 - 30) / 2);
        let radius = (CHART_HEIGHT as f64 - 80.0) / 2.0 - 20.0;

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.label_style(("sans-serif", 16).into_font());
        root.draw(&pie).map_err(render_err)?;

        root.present().map_err(render_err)?;
        Ok(())
    })
}

/// First `limit` rows of a column as (row index, value) pairs, missing cells
/// skipped. Fails if nothing in the window is numeric.
fn leading_points(
    table: &Table,
    column: &str,
    limit: usize,
) -> Result<Vec<(usize, f64)>, DashboardError> {
    let points: Vec<(usize, f64)> = table
        .column_cells(column)?
        .into_iter()
        .take(limit)
        .enumerate()
        .filter_map(|(i, v)| v.as_number().map(|n| (i, n)))
        .collect();
    if points.is_empty() {
        return Err(DashboardError::EmptyColumn(column.to_string()));
    }
    Ok(points)
}

fn value_bounds(points: &[(usize, f64)]) -> (f64, f64) {
    let min_v = points.iter().map(|&(_, v)| v).fold(f64::INFINITY, f64::min);
    let max_v = points
        .iter()
        .map(|&(_, v)| v)
        .fold(f64::NEG_INFINITY, f64::max);
    (min_v, max_v)
}

fn padded_upper(hi: f64, lo: f64) -> f64 {
    if hi > lo {
        hi + (hi - lo) * 0.05
    } else {
        hi + 1.0
    }
}

fn padded_lower(lo: f64, hi: f64) -> f64 {
    if hi > lo {
        lo - (hi - lo) * 0.05
    } else {
        lo - 1.0
    }
}

/// Fixed-width binning over [min, max]. Values exactly on the upper edge go
/// into the last bin.
pub fn histogram_bins(values: &[f64], bins: usize) -> (Vec<usize>, f64, f64) {
    let min_v = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max_v = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut counts = vec![0usize; bins];

    if min_v == max_v {
        counts[0] = values.len();
        return (counts, min_v, max_v);
    }

    let width = (max_v - min_v) / bins as f64;
    for &v in values {
        let idx = (((v - min_v) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    (counts, min_v, max_v)
}

/// Slice sizes and labels for the pie: groups with a non-positive sum cannot
/// be drawn as an angle and are left out.
pub fn pie_slices(groups: &[GroupSum]) -> (Vec<f64>, Vec<String>) {
    let mut sizes = Vec::new();
    let mut labels = Vec::new();
    for g in groups {
        if g.sum > 0.0 {
            sizes.push(g.sum);
            labels.push(g.key.clone());
        }
    }
    (sizes, labels)
}

/// Linear blend across the value range, dark violet at the low end to yellow
/// at the high end.
pub fn magnitude_color(value: f64, min: f64, max: f64) -> RGBColor {
    let t = if max > min {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    } else {
        0.5
    };
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    // viridis endpoints
    let (lo, hi) = ((68u8, 1u8, 84u8), (253u8, 231u8, 37u8));
    RGBColor(lerp(lo.0, hi.0), lerp(lo.1, hi.1), lerp(lo.2, hi.2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    fn column_table(values: Vec<Value>) -> Table {
        Table::new(
            vec!["x".into()],
            values.into_iter().map(|v| vec![v]).collect(),
        )
    }

    #[test]
    fn chart_kind_round_trips_through_strings() {
        for kind in [
            ChartKind::Bar,
            ChartKind::Line,
            ChartKind::Histogram,
            ChartKind::Pie,
        ] {
            assert_eq!(kind.as_str().parse::<ChartKind>().unwrap(), kind);
        }
        assert!("scatter".parse::<ChartKind>().is_err());
    }

    #[test]
    fn leading_points_caps_rows_and_skips_missing() {
        let mut cells: Vec<Value> = (0..30).map(|i| Value::Number(i as f64)).collect();
        cells[1] = Value::Missing;
        let table = column_table(cells);
        let points = leading_points(&table, "x", BAR_ROW_LIMIT).unwrap();
        assert_eq!(points.len(), 19); // 20-row window minus one gap
        assert_eq!(points[0], (0, 0.0));
        assert_eq!(points[1], (2, 2.0)); // row position kept, not compacted
        assert_eq!(points.last(), Some(&(19, 19.0)));
    }

    #[test]
    fn leading_points_fails_on_an_empty_window() {
        let table = column_table(vec![Value::Missing, Value::Missing]);
        assert!(matches!(
            leading_points(&table, "x", BAR_ROW_LIMIT),
            Err(DashboardError::EmptyColumn(_))
        ));
    }

    #[test]
    fn histogram_bins_span_the_observed_range() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let (counts, min_v, max_v) = histogram_bins(&values, HISTOGRAM_BINS);
        assert_eq!(counts.len(), 20);
        assert_eq!(min_v, 0.0);
        assert_eq!(max_v, 99.0);
        assert_eq!(counts.iter().sum::<usize>(), 100);
        // The maximum lands in the last bin, not past it.
        assert!(counts[19] >= 1);
    }

    #[test]
    fn histogram_bins_handle_a_constant_column() {
        let (counts, min_v, max_v) = histogram_bins(&[4.0, 4.0, 4.0], HISTOGRAM_BINS);
        assert_eq!(counts[0], 3);
        assert_eq!(counts[1..].iter().sum::<usize>(), 0);
        assert_eq!(min_v, max_v);
    }

    #[test]
    fn pie_slices_drop_non_positive_groups() {
        let groups = vec![
            GroupSum { key: "a".into(), sum: 5.0 },
            GroupSum { key: "b".into(), sum: 0.0 },
            GroupSum { key: "c".into(), sum: -2.0 },
            GroupSum { key: "d".into(), sum: 1.0 },
        ];
        let (sizes, labels) = pie_slices(&groups);
        assert_eq!(sizes, vec![5.0, 1.0]);
        assert_eq!(labels, vec!["a".to_string(), "d".to_string()]);
    }

    #[test]
    fn magnitude_color_spans_the_gradient() {
        let low = magnitude_color(0.0, 0.0, 10.0);
        let high = magnitude_color(10.0, 0.0, 10.0);
        assert_eq!(low, RGBColor(68, 1, 84));
        assert_eq!(high, RGBColor(253, 231, 37));
        // Constant columns get the midpoint rather than dividing by zero.
        let mid = magnitude_color(5.0, 5.0, 5.0);
        assert_ne!(mid, low);
        assert_ne!(mid, high);
    }
}
