//! Daily sleep payload of the wearable service.
//!
//! Every metric arrives on its own native grid: heart rate every 2 minutes,
//! movement every minute, HRV every 5 minutes, respiration every 2 minutes and
//! sleep levels as irregular intervals.

use chrono::NaiveDateTime;
use sleepweather_types::{Sample, Series, SleepStage};

use crate::{
    CodecError,
    helpers::{from_epoch_millis, parse_gmt},
};

#[derive(Debug, Clone, Deserialize)]
pub struct EpochValue {
    #[serde(rename = "startGMT")]
    pub start_gmt: i64,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInterval {
    #[serde(rename = "startGMT")]
    pub start_gmt: String,
    #[serde(rename = "endGMT", default)]
    pub end_gmt: Option<String>,
    pub activity_level: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespirationEpoch {
    #[serde(rename = "startTimeGMT")]
    pub start_time_gmt: i64,
    pub respiration_value: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepPayload {
    #[serde(default)]
    pub sleep_heart_rate: Vec<EpochValue>,
    #[serde(default)]
    pub sleep_movement: Vec<LevelInterval>,
    #[serde(default)]
    pub hrv_data: Vec<EpochValue>,
    #[serde(default, rename = "wellnessEpochRespirationDataDTOList")]
    pub respiration: Vec<RespirationEpoch>,
    #[serde(default)]
    pub sleep_levels: Vec<LevelInterval>,
}

/// The five raw per-metric tables of one night, timestamps in UTC.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSleep {
    pub heart_rate: Series<f64>,
    pub movement: Series<f64>,
    pub hrv: Series<f64>,
    /// Without the payload's first respiration epoch.
    pub respiration: Series<f64>,
    pub sleep_stage: Series<SleepStage>,
}

impl SleepPayload {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, CodecError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Samples without a value are dropped; they carry no observation.
    ///
    /// The first respiration epoch as listed in the payload is discarded
    /// before anything else: its interval is inconsistent with the rest of
    /// the night, whatever its timestamp or value.
    pub fn decode(&self) -> Result<RawSleep, CodecError> {
        Ok(RawSleep {
            heart_rate: epoch_series(&self.sleep_heart_rate)?,
            movement: level_series(&self.sleep_movement, Ok)?,
            hrv: epoch_series(&self.hrv_data)?,
            respiration: Series::new(
                self.respiration
                    .iter()
                    .skip(1)
                    .filter_map(|r| r.respiration_value.map(|v| (r.start_time_gmt, v)))
                    .map(|(ms, v)| Ok(Sample::new(from_epoch_millis(ms)?, v)))
                    .collect::<Result<Vec<_>, CodecError>>()?,
            ),
            sleep_stage: level_series(&self.sleep_levels, |v| Ok(SleepStage::try_from(v)?))?,
        })
    }
}

fn epoch_series(values: &[EpochValue]) -> Result<Series<f64>, CodecError> {
    let samples = values
        .iter()
        .filter_map(|e| e.value.map(|v| (e.start_gmt, v)))
        .map(|(ms, v)| Ok(Sample::new(from_epoch_millis(ms)?, v)))
        .collect::<Result<Vec<_>, CodecError>>()?;
    Ok(Series::new(samples))
}

fn level_series<T, F>(intervals: &[LevelInterval], convert: F) -> Result<Series<T>, CodecError>
where
    T: Copy,
    F: Fn(f64) -> Result<T, CodecError>,
{
    let samples = intervals
        .iter()
        .filter_map(|i| i.activity_level.map(|level| (&i.start_gmt, level)))
        .map(|(start, level)| {
            let time: NaiveDateTime = parse_gmt(start)?;
            Ok(Sample::new(time, convert(level)?))
        })
        .collect::<Result<Vec<_>, CodecError>>()?;
    Ok(Series::new(samples))
}
