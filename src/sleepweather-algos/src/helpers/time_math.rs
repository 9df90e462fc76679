use chrono::{NaiveDateTime, TimeDelta, Timelike as _};

pub fn floor_minute(time: NaiveDateTime) -> NaiveDateTime {
    time.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time)
}

/// Every whole minute from `start` to `end`, both inclusive.
pub fn minute_grid(start: NaiveDateTime, end: NaiveDateTime) -> Vec<NaiveDateTime> {
    let start = floor_minute(start);
    if end < start {
        return Vec::new();
    }

    let minutes = (end - start).num_minutes();
    (0..=minutes)
        .map(|m| start + TimeDelta::minutes(m))
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0_f64
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample variance (n - 1).
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0_f64;
    }
    let mean = mean(values);
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

pub fn round_float(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
