use chrono::NaiveDateTime;
use sleepweather_types::SleepMetric;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AlignError {
    #[error("no {0} samples to align")]
    EmptySeries(SleepMetric),
    #[error("sleep metrics never overlap (latest start {start}, earliest end {end})")]
    NoOverlap {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}
