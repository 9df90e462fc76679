use std::{collections::BTreeMap, fs, path::Path};

use anyhow::{Context, anyhow};
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use sleepweather_types::{CombinedRow, SleepStage};

/// One minute of the combined table as stored in the JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "heartRateValue")]
    pub heart_rate: f64,
    #[serde(rename = "movementValue")]
    pub movement: f64,
    #[serde(rename = "hrvValue")]
    pub hrv: f64,
    #[serde(rename = "respirationValue")]
    pub respiration: f64,
    #[serde(rename = "sleepStage")]
    pub sleep_stage: SleepStage,
    #[serde(rename = "temperatureValue")]
    pub temperature: Option<f64>,
    #[serde(rename = "humidityValue")]
    pub humidity: Option<f64>,
    #[serde(rename = "pressureValue")]
    pub pressure: Option<f64>,
    #[serde(rename = "precipitationValue")]
    pub precipitation: Option<f64>,
}

impl From<&CombinedRow> for Record {
    fn from(row: &CombinedRow) -> Self {
        Self {
            heart_rate: row.heart_rate,
            movement: row.movement,
            hrv: row.hrv,
            respiration: row.respiration,
            sleep_stage: row.sleep_stage,
            temperature: row.temperature,
            humidity: row.humidity,
            pressure: row.pressure,
            precipitation: row.precipitation,
        }
    }
}

/// Combined rows keyed by epoch milliseconds. JSON object keys are the
/// decimal strings of those milliseconds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    records: BTreeMap<i64, Record>,
}

impl Document {
    pub fn from_rows(rows: &[CombinedRow]) -> Self {
        let records = rows
            .iter()
            .map(|row| (row.time.and_utc().timestamp_millis(), Record::from(row)))
            .collect();
        Self { records }
    }

    pub fn to_rows(&self) -> anyhow::Result<Vec<CombinedRow>> {
        self.records
            .iter()
            .map(|(&millis, record)| {
                let time = DateTime::from_timestamp_millis(millis)
                    .ok_or_else(|| anyhow!("timestamp out of range: {millis}"))?
                    .naive_utc();
                Ok(CombinedRow {
                    time,
                    heart_rate: record.heart_rate,
                    movement: record.movement,
                    hrv: record.hrv,
                    respiration: record.respiration,
                    sleep_stage: record.sleep_stage,
                    temperature: record.temperature,
                    humidity: record.humidity,
                    pressure: record.pressure,
                    precipitation: record.precipitation,
                })
            })
            .collect()
    }

    /// Key-wise merge; records of `other` replace those with the same key.
    pub fn merge(&mut self, other: Document) {
        self.records.extend(other.records);
    }

    pub fn records(&self) -> &BTreeMap<i64, Record> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Writes `rows` to `path` as pretty-printed JSON, replacing any previous
/// content.
pub fn write_document(path: &Path, rows: &[CombinedRow]) -> anyhow::Result<Document> {
    let document = Document::from_rows(rows);
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(&document)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote {} rows to {}", document.len(), path.display());
    Ok(document)
}

pub fn read_document(path: &Path) -> anyhow::Result<Document> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let document: Document = serde_json::from_slice(&bytes)
        .with_context(|| format!("{} is not a combined data document", path.display()))?;
    debug!("read {} rows from {}", document.len(), path.display());
    Ok(document)
}
