use chrono::NaiveDateTime;

use crate::{Column, SleepStage, WeatherMetric};

/// One minute of the aligned night.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SleepRow {
    pub time: NaiveDateTime,
    pub heart_rate: f64,
    pub movement: f64,
    pub hrv: f64,
    pub respiration: f64,
    pub sleep_stage: SleepStage,
}

/// One minute of resampled weather. A value is `None` outside the observed
/// span of its variable.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct WeatherRow {
    pub time: NaiveDateTime,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub precipitation: Option<f64>,
}

impl WeatherRow {
    pub fn value(&self, metric: WeatherMetric) -> Option<f64> {
        match metric {
            WeatherMetric::Temperature => self.temperature,
            WeatherMetric::Humidity => self.humidity,
            WeatherMetric::Pressure => self.pressure,
            WeatherMetric::Precipitation => self.precipitation,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.temperature.is_some()
            && self.humidity.is_some()
            && self.pressure.is_some()
            && self.precipitation.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CombinedRow {
    pub time: NaiveDateTime,
    pub heart_rate: f64,
    pub movement: f64,
    pub hrv: f64,
    pub respiration: f64,
    pub sleep_stage: SleepStage,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub precipitation: Option<f64>,
}

impl CombinedRow {
    pub fn new(sleep: &SleepRow, weather: Option<&WeatherRow>) -> Self {
        let weather = weather.copied().unwrap_or_default();
        Self {
            time: sleep.time,
            heart_rate: sleep.heart_rate,
            movement: sleep.movement,
            hrv: sleep.hrv,
            respiration: sleep.respiration,
            sleep_stage: sleep.sleep_stage,
            temperature: weather.temperature,
            humidity: weather.humidity,
            pressure: weather.pressure,
            precipitation: weather.precipitation,
        }
    }

    pub fn value(&self, column: Column) -> Option<f64> {
        match column {
            Column::HeartRate => Some(self.heart_rate),
            Column::Movement => Some(self.movement),
            Column::Hrv => Some(self.hrv),
            Column::Respiration => Some(self.respiration),
            Column::SleepStage => Some(self.sleep_stage.code()),
            Column::Temperature => self.temperature,
            Column::Humidity => self.humidity,
            Column::Precipitation => self.precipitation,
            Column::Pressure => self.pressure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn sleep_row() -> SleepRow {
        SleepRow {
            time: base_time(),
            heart_rate: 60.0,
            movement: 0.5,
            hrv: 40.0,
            respiration: 14.0,
            sleep_stage: SleepStage::Rem,
        }
    }

    #[test]
    fn missing_weather_leaves_nulls() {
        let row = CombinedRow::new(&sleep_row(), None);
        assert_eq!(row.value(Column::HeartRate), Some(60.0));
        assert_eq!(row.value(Column::SleepStage), Some(2.0));
        assert_eq!(row.value(Column::Temperature), None);
        assert_eq!(row.value(Column::Pressure), None);
    }

    #[test]
    fn weather_values_carried_over() {
        let weather = WeatherRow {
            time: base_time(),
            temperature: Some(4.5),
            humidity: Some(80.0),
            pressure: Some(950.0),
            precipitation: None,
        };
        let row = CombinedRow::new(&sleep_row(), Some(&weather));
        assert_eq!(row.value(Column::Temperature), Some(4.5));
        assert_eq!(row.value(Column::Humidity), Some(80.0));
        assert_eq!(row.value(Column::Precipitation), None);
        assert!(!weather.is_complete());
    }
}
