use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The five per-metric tables of one night.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum SleepMetric {
    #[strum(serialize = "heart rate")]
    HeartRate,
    #[strum(serialize = "movement")]
    Movement,
    #[strum(serialize = "heart rate variability")]
    Hrv,
    #[strum(serialize = "respiration")]
    Respiration,
    #[strum(serialize = "sleep stage")]
    SleepStage,
}

impl SleepMetric {
    /// Continuously valued metrics; these bound the aligned window.
    pub const NUMERIC: [SleepMetric; 4] = [
        SleepMetric::HeartRate,
        SleepMetric::Movement,
        SleepMetric::Hrv,
        SleepMetric::Respiration,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum WeatherMetric {
    #[strum(serialize = "temperature")]
    Temperature,
    #[strum(serialize = "humidity")]
    Humidity,
    #[strum(serialize = "pressure")]
    Pressure,
    #[strum(serialize = "precipitation")]
    Precipitation,
}

/// Columns of the combined table, keyed by their document field names.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter, EnumString, IntoStaticStr,
)]
pub enum Column {
    #[strum(serialize = "heartRateValue")]
    HeartRate,
    #[strum(serialize = "movementValue")]
    Movement,
    #[strum(serialize = "hrvValue")]
    Hrv,
    #[strum(serialize = "respirationValue")]
    Respiration,
    #[strum(serialize = "sleepStage")]
    SleepStage,
    #[strum(serialize = "temperatureValue")]
    Temperature,
    #[strum(serialize = "humidityValue")]
    Humidity,
    #[strum(serialize = "precipitationValue")]
    Precipitation,
    #[strum(serialize = "pressureValue")]
    Pressure,
}

impl Column {
    pub fn key(self) -> &'static str {
        self.into()
    }

    pub fn label(self) -> &'static str {
        match self {
            Column::HeartRate => "Heart Rate (bpm)",
            Column::Movement => "Movement",
            Column::Hrv => "HRV",
            Column::Respiration => "Respiration",
            Column::SleepStage => "Sleep Stage",
            Column::Temperature => "Temperature (°C)",
            Column::Humidity => "Humidity (%)",
            Column::Precipitation => "Precipitation (mm)",
            Column::Pressure => "Pressure (hPa)",
        }
    }

    pub fn is_weather(self) -> bool {
        matches!(
            self,
            Column::Temperature | Column::Humidity | Column::Precipitation | Column::Pressure
        )
    }
}

impl From<WeatherMetric> for Column {
    fn from(metric: WeatherMetric) -> Self {
        match metric {
            WeatherMetric::Temperature => Column::Temperature,
            WeatherMetric::Humidity => Column::Humidity,
            WeatherMetric::Pressure => Column::Pressure,
            WeatherMetric::Precipitation => Column::Precipitation,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn column_keys_parse_back() {
        for column in Column::iter() {
            assert_eq!(Column::from_str(column.key()), Ok(column));
        }
    }

    #[test]
    fn nine_columns_four_weather() {
        assert_eq!(Column::iter().count(), 9);
        assert_eq!(Column::iter().filter(|c| c.is_weather()).count(), 4);
    }

    #[test]
    fn sleep_stage_is_not_numeric_bound() {
        assert!(!SleepMetric::NUMERIC.contains(&SleepMetric::SleepStage));
    }
}
