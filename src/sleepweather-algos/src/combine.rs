use std::fmt::Display;

use sleepweather_types::{CombinedRow, SleepRow, WeatherRow};

use crate::helpers::format_hm::FormatHM;

pub struct Combiner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoverageReport {
    pub sleep_rows: usize,
    /// Sleep minutes with no weather row at the same timestamp.
    pub missing_weather: usize,
    /// Sleep minutes matched to a weather row with at least one null column.
    pub partial_weather: usize,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.missing_weather == 0 && self.partial_weather == 0
    }
}

impl Display for CoverageReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{} of sleep, {} without weather, {} with partial weather",
            self.sleep_rows.format_hm(),
            self.missing_weather.format_hm(),
            self.partial_weather.format_hm()
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Combined {
    pub rows: Vec<CombinedRow>,
    pub coverage: CoverageReport,
}

impl Combiner {
    /// Left-joins aligned sleep rows with weather rows on timestamp. Sleep
    /// rows decide which timestamps appear; unmatched weather rows are
    /// dropped.
    pub fn combine(sleep: &[SleepRow], weather: &[WeatherRow]) -> Combined {
        let mut coverage = CoverageReport {
            sleep_rows: sleep.len(),
            ..Default::default()
        };

        let rows = sleep
            .iter()
            .map(|row| {
                let matched = Self::lookup(weather, row);
                match matched {
                    None => coverage.missing_weather += 1,
                    Some(w) if !w.is_complete() => coverage.partial_weather += 1,
                    Some(_) => {}
                }
                CombinedRow::new(row, matched)
            })
            .collect();

        if coverage.is_complete() {
            info!("combined {} minutes with full weather coverage", sleep.len());
        } else {
            warn!("weather does not cover the sleep window: {coverage}");
        }

        Combined { rows, coverage }
    }

    fn lookup<'a>(weather: &'a [WeatherRow], row: &SleepRow) -> Option<&'a WeatherRow> {
        let idx = weather.partition_point(|w| w.time < row.time);
        weather.get(idx).filter(|w| w.time == row.time)
    }
}
