use std::fmt::Display;

use sleepweather_types::{Column, CombinedRow};
use strum::IntoEnumIterator;

use crate::helpers::time_math::{mean, round_float, variance};

/// Pearson correlation between the columns of a combined table.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<Column>,
    /// Row-major, `columns.len()` squared. `None` when a pair has fewer than
    /// two rows with both values present or no variance on those rows.
    pub values: Vec<Option<f64>>,
    /// Columns left out because they are missing or constant.
    pub skipped: Vec<Column>,
}

impl CorrelationMatrix {
    pub fn compute(rows: &[CombinedRow]) -> Self {
        let mut columns = Vec::new();
        let mut skipped = Vec::new();

        for column in Column::iter() {
            let present: Vec<f64> = rows.iter().filter_map(|r| r.value(column)).collect();
            if present.len() < 2 || variance(&present) == 0.0 {
                debug!("skipping {} in correlation: no variation", column.label());
                skipped.push(column);
            } else {
                columns.push(column);
            }
        }
        if !skipped.is_empty() {
            info!(
                "correlation skips {}",
                skipped
                    .iter()
                    .map(|c| c.label())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }

        let mut values = Vec::with_capacity(columns.len() * columns.len());
        for &a in &columns {
            for &b in &columns {
                values.push(if a == b {
                    Some(1.0)
                } else {
                    Self::pearson(rows, a, b)
                });
            }
        }

        Self {
            columns,
            values,
            skipped,
        }
    }

    fn pearson(rows: &[CombinedRow], a: Column, b: Column) -> Option<f64> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = rows
            .iter()
            .filter_map(|r| Some((r.value(a)?, r.value(b)?)))
            .unzip();
        if xs.len() < 2 {
            return None;
        }

        let (mx, my) = (mean(&xs), mean(&ys));
        let mut cov = 0.0;
        let mut sx = 0.0;
        let mut sy = 0.0;
        for (x, y) in xs.iter().zip(&ys) {
            cov += (x - mx) * (y - my);
            sx += (x - mx).powi(2);
            sy += (y - my).powi(2);
        }
        if sx == 0.0 || sy == 0.0 {
            return None;
        }
        Some((cov / (sx * sy).sqrt()).clamp(-1.0, 1.0))
    }

    pub fn get(&self, a: Column, b: Column) -> Option<f64> {
        let i = self.columns.iter().position(|&c| c == a)?;
        let j = self.columns.iter().position(|&c| c == b)?;
        self.values[i * self.columns.len() + j]
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl Display for CorrelationMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for &a in &self.columns {
            f.write_fmt(format_args!("{:>14}", a.label()))?;
            for &b in &self.columns {
                match self.get(a, b) {
                    Some(v) => f.write_fmt(format_args!(" {:>6.2}", round_float(v)))?,
                    None => f.write_str("      -")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
    use sleepweather_types::SleepStage;

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 8)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap()
    }

    fn rows(n: i64) -> Vec<CombinedRow> {
        (0..n)
            .map(|m| {
                let x = m as f64;
                CombinedRow {
                    time: base_time() + TimeDelta::minutes(m),
                    heart_rate: 50.0 + x,
                    movement: 10.0 - 0.5 * x,
                    hrv: 30.0 + (m % 4) as f64,
                    respiration: 14.0 + 2.0 * x,
                    sleep_stage: SleepStage::Light,
                    temperature: Some(5.0 + 0.1 * x),
                    humidity: None,
                    pressure: Some(950.0),
                    precipitation: (m % 2 == 0).then_some(x),
                }
            })
            .collect()
    }

    #[test]
    fn linear_columns_correlate_fully() {
        let matrix = CorrelationMatrix::compute(&rows(40));

        let hr_resp = matrix.get(Column::HeartRate, Column::Respiration).unwrap();
        assert!((hr_resp - 1.0).abs() < 1e-9);
        let hr_move = matrix.get(Column::HeartRate, Column::Movement).unwrap();
        assert!((hr_move + 1.0).abs() < 1e-9);
        assert_eq!(matrix.get(Column::Hrv, Column::Hrv), Some(1.0));
    }

    #[test]
    fn constant_and_missing_columns_are_skipped() {
        let matrix = CorrelationMatrix::compute(&rows(40));
        assert_eq!(
            matrix.skipped,
            vec![Column::SleepStage, Column::Humidity, Column::Pressure]
        );
        assert_eq!(matrix.len(), 6);
        assert_eq!(matrix.get(Column::Pressure, Column::HeartRate), None);
    }

    #[test]
    fn pairs_use_rows_where_both_present() {
        let matrix = CorrelationMatrix::compute(&rows(40));
        let precip = matrix
            .get(Column::HeartRate, Column::Precipitation)
            .unwrap();
        assert!((precip - 1.0).abs() < 1e-9);
    }

    #[test]
    fn symmetric() {
        let matrix = CorrelationMatrix::compute(&rows(40));
        for &a in &matrix.columns {
            for &b in &matrix.columns {
                assert_eq!(matrix.get(a, b), matrix.get(b, a));
            }
        }
    }

    #[test]
    fn empty_table() {
        let matrix = CorrelationMatrix::compute(&[]);
        assert!(matrix.is_empty());
        assert_eq!(matrix.skipped.len(), 9);
        assert_eq!(matrix.to_string(), "");
    }
}
