use sleepweather_algos::{Combined, Combiner, SleepAligner, WeatherResampler};
use sleepweather_types::SleepWindow;

use crate::{garmin::GarminClient, weather::WeatherClient};

/// Sleep and weather for one night, aligned on the sleep timeline.
pub async fn collect_night(
    garmin: &GarminClient,
    weather: &WeatherClient,
    window: &SleepWindow,
) -> anyhow::Result<Combined> {
    let payload = garmin.sleep_data(window.sleep_date()).await?;
    let sleep = SleepAligner::align(&payload.decode()?)?;
    if let Some(first) = sleep.first() {
        debug!("first aligned row: {first:?}");
    }

    let observations = weather.observations(window).await?;
    let weather_rows = WeatherResampler::resample(&observations);

    Ok(Combiner::combine(&sleep, &weather_rows))
}
