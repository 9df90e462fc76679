use sleepweather_codec::WeatherObservations;
use sleepweather_types::{WeatherMetric, WeatherRow};
use strum::IntoEnumIterator;

use crate::{
    helpers::time_math::{floor_minute, minute_grid},
    interpolate::interpolate_linear,
};

pub struct WeatherResampler;

impl WeatherResampler {
    /// Interpolates every weather variable onto the 1-minute grid spanning
    /// the observed window. Minutes outside a variable's own samples stay
    /// `None`.
    pub fn resample(observations: &WeatherObservations) -> Vec<WeatherRow> {
        let grid = minute_grid(floor_minute(observations.start), observations.end);
        let mut rows: Vec<WeatherRow> = grid
            .iter()
            .map(|&time| WeatherRow {
                time,
                ..Default::default()
            })
            .collect();

        for metric in WeatherMetric::iter() {
            let series = observations.series(metric).map_times(floor_minute);
            let values = interpolate_linear(&series, &grid);
            for (row, value) in rows.iter_mut().zip(values) {
                match metric {
                    WeatherMetric::Temperature => row.temperature = value,
                    WeatherMetric::Humidity => row.humidity = value,
                    WeatherMetric::Pressure => row.pressure = value,
                    WeatherMetric::Precipitation => row.precipitation = value,
                }
            }
        }

        debug!(
            "resampled weather to {} minutes ({} to {})",
            rows.len(),
            observations.start,
            observations.end
        );
        rows
    }
}
