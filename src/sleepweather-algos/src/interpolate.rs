use chrono::NaiveDateTime;
use sleepweather_types::{Sample, Series};

fn lerp(before: &Sample<f64>, after: &Sample<f64>, time: NaiveDateTime) -> f64 {
    let span = (after.time - before.time).num_milliseconds() as f64;
    let elapsed = (time - before.time).num_milliseconds() as f64;
    before.value + (after.value - before.value) * (elapsed / span)
}

/// Value of `series` at `time`, blended by elapsed time between the
/// neighbouring samples. `None` outside the observed span.
pub fn interpolate_at(series: &Series<f64>, time: NaiveDateTime) -> Option<f64> {
    let samples = series.samples();
    let idx = samples.partition_point(|s| s.time < time);
    let after = samples.get(idx)?;
    if after.time == time {
        return Some(after.value);
    }
    let before = samples.get(idx.checked_sub(1)?)?;
    Some(lerp(before, after, time))
}

/// [`interpolate_at`] over an ascending grid in a single pass.
pub fn interpolate_linear(series: &Series<f64>, grid: &[NaiveDateTime]) -> Vec<Option<f64>> {
    let samples = series.samples();
    let mut idx = 0;

    grid.iter()
        .map(|&time| {
            while idx < samples.len() && samples[idx].time < time {
                idx += 1;
            }
            let after = samples.get(idx)?;
            if after.time == time {
                return Some(after.value);
            }
            let before = samples.get(idx.checked_sub(1)?)?;
            Some(lerp(before, after, time))
        })
        .collect()
}

/// Each grid time takes the latest sample at or before it; `default` until
/// the first sample.
pub fn forward_fill<T: Copy>(series: &Series<T>, grid: &[NaiveDateTime], default: T) -> Vec<T> {
    let samples = series.samples();
    let mut idx = 0;
    let mut current = default;

    grid.iter()
        .map(|&time| {
            while idx < samples.len() && samples[idx].time <= time {
                current = samples[idx].value;
                idx += 1;
            }
            current
        })
        .collect()
}
