//! Synthetic night shared by the aligner and combiner tests.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use sleepweather_codec::{
    RawSleep, SleepPayload,
    garmin::{EpochValue, LevelInterval, RespirationEpoch},
};

pub fn night_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 8)
        .unwrap()
        .and_hms_opt(22, 0, 0)
        .unwrap()
}

pub fn at(minutes: i64) -> NaiveDateTime {
    night_start() + TimeDelta::minutes(minutes)
}

fn ms(time: NaiveDateTime) -> i64 {
    time.and_utc().timestamp_millis()
}

fn gmt(time: NaiveDateTime) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.1f").to_string()
}

fn epochs(step: i64, from: i64, to: i64, value: impl Fn(i64) -> f64) -> Vec<EpochValue> {
    (from..=to)
        .step_by(step as usize)
        .map(|m| EpochValue {
            start_gmt: ms(at(m)),
            value: Some(value(m)),
        })
        .collect()
}

fn levels(starts: &[(i64, f64)]) -> Vec<LevelInterval> {
    starts
        .iter()
        .map(|&(m, level)| LevelInterval {
            start_gmt: gmt(at(m)),
            end_gmt: None,
            activity_level: Some(level),
        })
        .collect()
}

/// Heart rate every 2 minutes between 60 and 80, movement every minute, HRV
/// every 5 minutes between 20 and 60, respiration every 2 minutes behind a
/// corrupt first epoch stamped mid-night, and stages 1 -> 2 -> 3 -> 1 at
/// minutes 10, 40, 70 and 90.
///
/// The numeric metrics overlap from minute 5 (HRV) to minute 115 (HRV).
pub fn night_payload() -> SleepPayload {
    let mut respiration = vec![RespirationEpoch {
        start_time_gmt: ms(at(31) + TimeDelta::seconds(13)),
        respiration_value: Some(99.0),
    }];
    respiration.extend((2..=118).step_by(2).map(|m| RespirationEpoch {
        start_time_gmt: ms(at(m)),
        respiration_value: Some(12.0 + (m % 6) as f64),
    }));

    SleepPayload {
        sleep_heart_rate: epochs(2, 0, 120, |m| 60.0 + (m % 21) as f64),
        sleep_movement: (-5..=125)
            .map(|m| LevelInterval {
                start_gmt: gmt(at(m)),
                end_gmt: Some(gmt(at(m + 1))),
                activity_level: Some((m.rem_euclid(3)) as f64 * 0.5),
            })
            .collect(),
        hrv_data: epochs(5, 5, 115, |m| 20.0 + (m % 41) as f64),
        respiration,
        sleep_levels: levels(&[(10, 1.0), (40, 2.0), (70, 3.0), (90, 1.0)]),
    }
}

pub fn night() -> RawSleep {
    night_payload().decode().unwrap()
}
