//! Forecast API payload (`timeformat=unixtime`).

use std::collections::HashMap;

use chrono::{NaiveDateTime, TimeDelta};
use sleepweather_types::{Sample, Series, WeatherMetric};

use crate::{CodecError, helpers::from_epoch_seconds};

pub fn variable_name(metric: WeatherMetric) -> &'static str {
    match metric {
        WeatherMetric::Temperature => "temperature_2m",
        WeatherMetric::Humidity => "relative_humidity_2m",
        WeatherMetric::Pressure => "surface_pressure",
        WeatherMetric::Precipitation => "precipitation",
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cadence {
    Hourly,
    Minutely15,
}

impl Cadence {
    pub fn interval(self) -> TimeDelta {
        match self {
            Cadence::Hourly => TimeDelta::hours(1),
            Cadence::Minutely15 => TimeDelta::minutes(15),
        }
    }

    pub fn block_name(self) -> &'static str {
        match self {
            Cadence::Hourly => "hourly",
            Cadence::Minutely15 => "minutely_15",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VariableBlock {
    pub time: Vec<i64>,
    #[serde(flatten)]
    pub variables: HashMap<String, Vec<Option<f64>>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub utc_offset_seconds: i64,
    #[serde(default)]
    pub hourly: Option<VariableBlock>,
    #[serde(default)]
    pub minutely_15: Option<VariableBlock>,
}

/// Native weather samples plus the fetched window they describe.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherObservations {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub temperature: Series<f64>,
    pub humidity: Series<f64>,
    pub pressure: Series<f64>,
    pub precipitation: Series<f64>,
}

impl WeatherObservations {
    pub fn series(&self, metric: WeatherMetric) -> &Series<f64> {
        match metric {
            WeatherMetric::Temperature => &self.temperature,
            WeatherMetric::Humidity => &self.humidity,
            WeatherMetric::Pressure => &self.pressure,
            WeatherMetric::Precipitation => &self.precipitation,
        }
    }
}

impl VariableBlock {
    /// Uniform axis from the first timestamp and the block's declared cadence,
    /// checked against the timestamps the payload lists.
    pub fn axis(&self, cadence: Cadence) -> Result<Vec<NaiveDateTime>, CodecError> {
        let (Some(&first), Some(&last)) = (self.time.first(), self.time.last()) else {
            return Ok(Vec::new());
        };

        let start = from_epoch_seconds(first)?;
        let end = from_epoch_seconds(last)? + cadence.interval();

        let mut axis = Vec::with_capacity(self.time.len());
        let mut time = start;
        while time < end {
            axis.push(time);
            time += cadence.interval();
        }

        if axis.len() != self.time.len() {
            return Err(CodecError::IrregularAxis {
                block: cadence.block_name(),
                index: axis.len().min(self.time.len()),
            });
        }

        for (index, (&expected, &listed)) in axis.iter().zip(&self.time).enumerate() {
            if expected.and_utc().timestamp() != listed {
                return Err(CodecError::IrregularAxis {
                    block: cadence.block_name(),
                    index,
                });
            }
        }

        Ok(axis)
    }

    /// A variable absent from the block yields an empty series; nulls are
    /// skipped.
    pub fn series(
        &self,
        axis: &[NaiveDateTime],
        cadence: Cadence,
        metric: WeatherMetric,
    ) -> Result<Series<f64>, CodecError> {
        let name = variable_name(metric);
        let Some(values) = self.variables.get(name) else {
            return Ok(Series::default());
        };

        if values.len() != axis.len() {
            return Err(CodecError::LengthMismatch {
                block: cadence.block_name(),
                variable: name.to_string(),
                expected: axis.len(),
                actual: values.len(),
            });
        }

        Ok(Series::new(
            axis.iter()
                .zip(values)
                .filter_map(|(&time, value)| value.map(|v| Sample::new(time, v)))
                .collect(),
        ))
    }
}

impl ForecastResponse {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Hourly samples define the window. Sub-hourly samples refine the
    /// instantaneous variables inside it; precipitation stays hourly since its
    /// sub-hourly values accumulate over a different period.
    pub fn observations(&self) -> Result<WeatherObservations, CodecError> {
        let hourly = self
            .hourly
            .as_ref()
            .ok_or(CodecError::MissingBlock("hourly"))?;
        let hourly_axis = hourly.axis(Cadence::Hourly)?;
        let (Some(&start), Some(&end)) = (hourly_axis.first(), hourly_axis.last()) else {
            return Err(CodecError::MissingBlock("hourly"));
        };

        let sub_hourly = match &self.minutely_15 {
            Some(block) => Some((block, block.axis(Cadence::Minutely15)?)),
            None => None,
        };

        let series = |metric: WeatherMetric| -> Result<Series<f64>, CodecError> {
            let coarse = hourly.series(&hourly_axis, Cadence::Hourly, metric)?;
            match &sub_hourly {
                Some((block, axis)) if metric != WeatherMetric::Precipitation => {
                    let fine = block.series(axis, Cadence::Minutely15, metric)?;
                    Ok(coarse.merged_with(&fine.clip(start, end)))
                }
                _ => Ok(coarse),
            }
        };

        Ok(WeatherObservations {
            start,
            end,
            temperature: series(WeatherMetric::Temperature)?,
            humidity: series(WeatherMetric::Humidity)?,
            pressure: series(WeatherMetric::Pressure)?,
            precipitation: series(WeatherMetric::Precipitation)?,
        })
    }
}
