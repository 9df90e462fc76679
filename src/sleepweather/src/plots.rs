use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use plotters::{coord::ranged1d::SegmentValue, prelude::*};
use sleepweather_algos::CorrelationMatrix;
use sleepweather_types::{Column, CombinedRow};
use strum::IntoEnumIterator;

const COOL: (f64, f64, f64) = (59.0, 76.0, 192.0);
const WARM: (f64, f64, f64) = (180.0, 4.0, 38.0);

/// Diverging blue-white-red scale for coefficients in [-1, 1].
pub fn coefficient_color(value: f64) -> RGBColor {
    let v = value.clamp(-1.0, 1.0);
    let (end, t) = if v < 0.0 { (COOL, -v) } else { (WARM, v) };
    let mix = |c: f64| (255.0 + (c - 255.0) * t).round() as u8;
    RGBColor(mix(end.0), mix(end.1), mix(end.2))
}

fn segment_label(columns: &[Column], value: &SegmentValue<usize>) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => columns
            .get(*i)
            .map(|c| c.label().to_owned())
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    }
}

pub fn correlation_heatmap(
    path: &Path,
    matrix: &CorrelationMatrix,
    date: NaiveDate,
) -> anyhow::Result<()> {
    let root = SVGBackend::new(path, (1100, 900)).into_drawing_area();
    root.fill(&WHITE)?;

    let n = matrix.len().max(1);
    let columns = &matrix.columns;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Correlation Heatmap {date}"), ("sans-serif", 26))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(150)
        .build_cartesian_2d((0..n).into_segmented(), (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|v| segment_label(columns, v))
        .y_label_formatter(&|v| segment_label(columns, v))
        .draw()?;

    // row 0 at the top
    let cells: Vec<(usize, usize, Option<f64>)> = (0..matrix.len())
        .flat_map(|i| {
            (0..matrix.len()).map(move |j| (i, j, matrix.values[i * matrix.len() + j]))
        })
        .collect();

    chart.draw_series(cells.iter().map(|&(i, j, value)| {
        let y = n - 1 - i;
        let color = value.map_or(RGBColor(220, 220, 220), coefficient_color);
        Rectangle::new(
            [
                (SegmentValue::Exact(j), SegmentValue::Exact(y)),
                (SegmentValue::Exact(j + 1), SegmentValue::Exact(y + 1)),
            ],
            color.filled(),
        )
    }))?;

    chart.draw_series(cells.iter().map(|&(i, j, value)| {
        let text = value.map_or_else(|| "-".to_owned(), |v| format!("{v:.2}"));
        Text::new(
            text,
            (SegmentValue::CenterOf(j), SegmentValue::CenterOf(n - 1 - i)),
            ("sans-serif", 14).into_font().color(&BLACK),
        )
    }))?;

    root.present()?;
    info!("wrote correlation heatmap to {}", path.display());
    Ok(())
}

/// Points of a step line that holds each value until the next sample.
pub fn step_points(points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut steps = Vec::with_capacity(points.len() * 2);
    for (i, &(x, y)) in points.iter().enumerate() {
        if i > 0 {
            steps.push((x, points[i - 1].1));
        }
        steps.push((x, y));
    }
    steps
}

fn y_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let (min, max) = values.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
    Some((min - pad, max + pad))
}

fn clock_label(start: NaiveDateTime, minutes: f64) -> String {
    (start + TimeDelta::minutes(minutes.round() as i64))
        .format("%H:%M")
        .to_string()
}

/// One panel per column on a 5 by 2 grid, minutes on the x axis.
pub fn time_series(path: &Path, rows: &[CombinedRow], date: NaiveDate) -> anyhow::Result<()> {
    let root = SVGBackend::new(path, (1400, 1600)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(
        &format!("Sleep and weather {date}"),
        ("sans-serif", 28),
    )?;

    let Some(start) = rows.first().map(|r| r.time) else {
        warn!("no rows to plot");
        root.present()?;
        return Ok(());
    };
    let span = rows
        .last()
        .map(|r| (r.time - start).num_minutes() as f64)
        .unwrap_or_default()
        .max(1.0);

    let panels = root.split_evenly((5, 2));
    for (panel, column) in panels.iter().zip(Column::iter()) {
        let points: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|r| Some(((r.time - start).num_minutes() as f64, r.value(column)?)))
            .collect();

        let Some((lo, hi)) = y_range(points.iter().map(|p| p.1)) else {
            debug!("no {} values to plot", column.label());
            continue;
        };

        let mut chart = ChartBuilder::on(panel)
            .caption(column.label(), ("sans-serif", 18))
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0.0..span, lo..hi)?;

        chart
            .configure_mesh()
            .x_labels(6)
            .x_label_formatter(&|m| clock_label(start, *m))
            .draw()?;

        let line = if column == Column::SleepStage {
            step_points(&points)
        } else {
            points
        };
        chart.draw_series(LineSeries::new(line, &BLUE))?;
    }

    root.present()?;
    info!("wrote time series chart to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sleepweather_types::SleepStage;

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 8)
            .unwrap()
            .and_hms_opt(0, 30, 0)
            .unwrap()
    }

    fn rows() -> Vec<CombinedRow> {
        (0..90)
            .map(|m| CombinedRow {
                time: base_time() + TimeDelta::minutes(m),
                heart_rate: 55.0 + (m % 9) as f64,
                movement: (m % 5) as f64 * 0.2,
                hrv: 35.0 + (m % 13) as f64,
                respiration: 13.0 + (m % 3) as f64,
                sleep_stage: if m < 40 { SleepStage::Deep } else { SleepStage::Rem },
                temperature: Some(3.0 + m as f64 / 30.0),
                humidity: Some(88.0),
                pressure: None,
                precipitation: Some(0.0),
            })
            .collect()
    }

    #[test]
    fn color_scale_ends() {
        assert_eq!(coefficient_color(0.0), RGBColor(255, 255, 255));
        assert_eq!(coefficient_color(1.0), RGBColor(180, 4, 38));
        assert_eq!(coefficient_color(-3.0), RGBColor(59, 76, 192));
    }

    #[test]
    fn step_holds_previous_value() {
        let steps = step_points(&[(0.0, 1.0), (10.0, 2.0), (25.0, 0.0)]);
        assert_eq!(
            steps,
            vec![
                (0.0, 1.0),
                (10.0, 1.0),
                (10.0, 2.0),
                (25.0, 2.0),
                (25.0, 0.0)
            ]
        );
    }

    #[test]
    fn flat_values_get_padding() {
        assert_eq!(y_range([88.0, 88.0].into_iter()), Some((87.0, 89.0)));
        assert_eq!(y_range(std::iter::empty()), None);
    }

    #[test]
    fn clock_labels() {
        assert_eq!(clock_label(base_time(), 45.0), "01:15");
    }

    #[test]
    fn renders_svg_files() {
        let dir = tempfile::tempdir().unwrap();
        let rows = rows();
        let date = base_time().date();

        let heatmap = dir.path().join("heatmap.svg");
        correlation_heatmap(&heatmap, &CorrelationMatrix::compute(&rows), date).unwrap();
        let series = dir.path().join("series.svg");
        time_series(&series, &rows, date).unwrap();

        for path in [heatmap, series] {
            let svg = std::fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"));
        }
    }
}
