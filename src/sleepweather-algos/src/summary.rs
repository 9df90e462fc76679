use std::{collections::BTreeMap, fmt::Display};

use chrono::NaiveDate;
use sleepweather_types::{Column, CombinedRow, SleepStage};

use crate::helpers::{
    format_hm::FormatHM,
    time_math::{mean, round_float},
};

/// Headline numbers for one calendar date of a combined table.
#[derive(Debug, Clone, PartialEq)]
pub struct NightSummary {
    pub date: NaiveDate,
    pub minutes: usize,
    pub heart_rate: Option<f64>,
    pub hrv: Option<f64>,
    pub movement: Option<f64>,
    pub respiration: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub total_precipitation: f64,
    pub stages: BTreeMap<SleepStage, usize>,
}

impl NightSummary {
    /// Summarises rows that all belong to `date`.
    pub fn new(date: NaiveDate, rows: &[CombinedRow]) -> Self {
        let average = |column: Column| {
            let values: Vec<f64> = rows.iter().filter_map(|r| r.value(column)).collect();
            (!values.is_empty()).then(|| round_float(mean(&values)))
        };

        let mut stages = BTreeMap::new();
        for row in rows {
            *stages.entry(row.sleep_stage).or_insert(0) += 1;
        }

        Self {
            date,
            minutes: rows.len(),
            heart_rate: average(Column::HeartRate),
            hrv: average(Column::Hrv),
            movement: average(Column::Movement),
            respiration: average(Column::Respiration),
            temperature: average(Column::Temperature),
            humidity: average(Column::Humidity),
            pressure: average(Column::Pressure),
            total_precipitation: round_float(rows.iter().filter_map(|r| r.precipitation).sum()),
            stages,
        }
    }

    /// Groups rows by the UTC date of their timestamp, one summary per date,
    /// newest first.
    pub fn split_nights(rows: &[CombinedRow]) -> Vec<Self> {
        let mut by_date: BTreeMap<NaiveDate, Vec<CombinedRow>> = BTreeMap::new();
        for row in rows {
            by_date.entry(row.time.date()).or_default().push(*row);
        }

        by_date
            .into_iter()
            .rev()
            .map(|(date, rows)| Self::new(date, &rows))
            .collect()
    }

    pub fn hours(&self) -> f64 {
        self.minutes as f64 / 60.0
    }
}

fn or_na(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "N/A".to_owned(), |v| format!("{v}{unit}"))
}

impl Display for NightSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{}: {:.1} hours ({})\n",
            self.date,
            self.hours(),
            self.minutes.format_hm()
        ))?;
        f.write_fmt(format_args!(
            "Heart rate: {}\nHRV: {}\nMovement: {}\nRespiration: {}\n",
            or_na(self.heart_rate, " bpm"),
            or_na(self.hrv, ""),
            or_na(self.movement, ""),
            or_na(self.respiration, " brpm"),
        ))?;
        f.write_fmt(format_args!(
            "Temperature: {}\nHumidity: {}\nPressure: {}\nPrecipitation: {:.1} mm\n",
            or_na(self.temperature, "°C"),
            or_na(self.humidity, "%"),
            or_na(self.pressure, " hPa"),
            self.total_precipitation,
        ))?;
        let stages = self
            .stages
            .iter()
            .map(|(stage, minutes)| format!("{stage} {}", minutes.format_hm()))
            .collect::<Vec<_>>()
            .join(", ");
        f.write_fmt(format_args!("Stages: {stages}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, TimeDelta};

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 7)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap()
    }

    fn row(minute: i64, stage: SleepStage) -> CombinedRow {
        CombinedRow {
            time: base_time() + TimeDelta::minutes(minute),
            heart_rate: if minute % 2 == 0 { 60.0 } else { 64.0 },
            movement: 0.5,
            hrv: 40.0,
            respiration: 14.0,
            sleep_stage: stage,
            temperature: (minute < 90).then_some(6.0),
            humidity: None,
            pressure: Some(955.0),
            precipitation: Some(0.1),
        }
    }

    fn rows() -> Vec<CombinedRow> {
        (0..120)
            .map(|m| {
                let stage = match m {
                    0..30 => SleepStage::Light,
                    30..80 => SleepStage::Deep,
                    _ => SleepStage::Rem,
                };
                row(m, stage)
            })
            .collect()
    }

    #[test]
    fn averages_ignore_missing_values() {
        let summary = NightSummary::new(base_time().date(), &rows());

        assert_eq!(summary.minutes, 120);
        assert_eq!(summary.hours(), 2.0);
        assert_eq!(summary.heart_rate, Some(62.0));
        assert_eq!(summary.temperature, Some(6.0));
        assert_eq!(summary.humidity, None);
        assert_eq!(summary.total_precipitation, 12.0);
        assert_eq!(summary.stages[&SleepStage::Deep], 50);
        assert_eq!(summary.stages[&SleepStage::Rem], 40);
    }

    #[test]
    fn splits_on_utc_date() {
        let nights = NightSummary::split_nights(&rows());

        assert_eq!(nights.len(), 2);
        assert_eq!(nights[0].date, NaiveDate::from_ymd_opt(2025, 3, 8).unwrap());
        assert_eq!(nights[0].minutes, 60);
        assert_eq!(nights[1].date, NaiveDate::from_ymd_opt(2025, 3, 7).unwrap());
        assert_eq!(nights[1].minutes, 60);
        assert_eq!(nights[0].temperature, Some(6.0));
    }

    #[test]
    fn display_lists_stages() {
        let summary = NightSummary::new(base_time().date(), &rows());
        let text = summary.to_string();

        assert!(text.starts_with("2025-03-07: 2.0 hours (2h 00min)"));
        assert!(text.contains("Humidity: N/A"));
        assert!(text.ends_with("Stages: Deep 0h 50min, Light 0h 30min, REM 0h 40min"));
    }
}
