use chrono::NaiveDateTime;
use sleepweather_codec::RawSleep;
use sleepweather_types::{Series, SleepMetric, SleepRow, SleepStage};

use crate::{
    AlignError,
    helpers::time_math::{floor_minute, minute_grid},
    interpolate::{forward_fill, interpolate_linear},
};

pub struct SleepAligner;

/// Raw tables after timestamp normalisation.
struct Normalized {
    heart_rate: Series<f64>,
    movement: Series<f64>,
    hrv: Series<f64>,
    respiration: Series<f64>,
    sleep_stage: Series<SleepStage>,
}

impl SleepAligner {
    /// Merges the five per-metric tables of one night onto a 1-minute grid.
    ///
    /// The grid spans the window where all four numeric metrics have
    /// observations: from the latest first sample to the earliest last
    /// sample, inclusive. Numeric columns are linearly interpolated in time,
    /// the sleep stage is carried forward from its latest level and starts as
    /// [`SleepStage::PLACEHOLDER`].
    pub fn align(raw: &RawSleep) -> Result<Vec<SleepRow>, AlignError> {
        let tables = Self::normalize(raw);
        tables.ensure_not_empty()?;

        let (start, end) = tables.overlap()?;
        debug!("sleep time range: {start} to {end}");

        let grid = minute_grid(start, end);
        let heart_rate = interpolate_linear(&tables.heart_rate, &grid);
        let movement = interpolate_linear(&tables.movement, &grid);
        let hrv = interpolate_linear(&tables.hrv, &grid);
        let respiration = interpolate_linear(&tables.respiration, &grid);
        let stages = forward_fill(&tables.sleep_stage, &grid, SleepStage::PLACEHOLDER);

        let rows = grid
            .iter()
            .enumerate()
            .map(|(i, &time)| {
                Some(SleepRow {
                    time,
                    heart_rate: heart_rate[i]?,
                    movement: movement[i]?,
                    hrv: hrv[i]?,
                    respiration: respiration[i]?,
                    sleep_stage: stages[i],
                })
            })
            .collect::<Option<Vec<_>>>()
            .ok_or(AlignError::NoOverlap { start, end })?;

        info!(
            "aligned {} minutes of sleep ({} to {})",
            rows.len(),
            start,
            end
        );
        Ok(rows)
    }

    /// Floors every timestamp to its minute.
    fn normalize(raw: &RawSleep) -> Normalized {
        Normalized {
            heart_rate: raw.heart_rate.map_times(floor_minute),
            movement: raw.movement.map_times(floor_minute),
            hrv: raw.hrv.map_times(floor_minute),
            respiration: raw.respiration.map_times(floor_minute),
            sleep_stage: raw.sleep_stage.map_times(floor_minute),
        }
    }
}

impl Normalized {
    fn numeric(&self, metric: SleepMetric) -> Option<&Series<f64>> {
        match metric {
            SleepMetric::HeartRate => Some(&self.heart_rate),
            SleepMetric::Movement => Some(&self.movement),
            SleepMetric::Hrv => Some(&self.hrv),
            SleepMetric::Respiration => Some(&self.respiration),
            SleepMetric::SleepStage => None,
        }
    }

    fn ensure_not_empty(&self) -> Result<(), AlignError> {
        for metric in SleepMetric::NUMERIC {
            if self.numeric(metric).is_none_or(Series::is_empty) {
                return Err(AlignError::EmptySeries(metric));
            }
        }
        if self.sleep_stage.is_empty() {
            return Err(AlignError::EmptySeries(SleepMetric::SleepStage));
        }
        Ok(())
    }

    /// Latest first sample and earliest last sample of the numeric metrics.
    fn overlap(&self) -> Result<(NaiveDateTime, NaiveDateTime), AlignError> {
        let mut start = NaiveDateTime::MIN;
        let mut end = NaiveDateTime::MAX;

        for metric in SleepMetric::NUMERIC {
            let series = self
                .numeric(metric)
                .ok_or(AlignError::EmptySeries(metric))?;
            let (Some(first), Some(last)) = (series.first_time(), series.last_time()) else {
                return Err(AlignError::EmptySeries(metric));
            };
            start = start.max(first);
            end = end.min(last);
        }

        if start > end {
            return Err(AlignError::NoOverlap { start, end });
        }
        Ok((start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use pretty_assertions::assert_eq;
    use rand::Rng;

    use crate::{
        fixtures::{at, night, night_start},
        interpolate::interpolate_at,
    };

    fn base_time() -> NaiveDateTime {
        night_start()
    }

    fn every(step: i64, from: i64, to: i64, value: impl Fn(i64) -> f64) -> Series<f64> {
        Series::from_pairs((from..=to).step_by(step as usize).map(|m| (at(m), value(m))))
    }

    #[test]
    fn window_is_intersection_of_numeric_metrics() {
        let rows = SleepAligner::align(&night()).unwrap();

        // hrv starts last and ends first
        assert_eq!(rows.first().unwrap().time, at(5));
        assert_eq!(rows.last().unwrap().time, at(115));
        assert_eq!(rows.len(), 111);
        for pair in rows.windows(2) {
            assert_eq!(pair[1].time - pair[0].time, TimeDelta::minutes(1));
        }
    }

    #[test]
    fn stages_follow_transitions() {
        let rows = SleepAligner::align(&night()).unwrap();
        for row in &rows {
            let minute = (row.time - base_time()).num_minutes();
            let expected = match minute {
                m if m < 10 => SleepStage::PLACEHOLDER,
                m if m < 40 => SleepStage::Light,
                m if m < 70 => SleepStage::Rem,
                m if m < 90 => SleepStage::Awake,
                _ => SleepStage::Light,
            };
            assert_eq!(row.sleep_stage, expected, "minute {minute}");
        }
    }

    #[test]
    fn numeric_gaps_are_linear_in_time() {
        let raw = night();
        let rows = SleepAligner::align(&raw).unwrap();

        let at_7 = rows.iter().find(|r| r.time == at(7)).unwrap();
        // hrv samples at 5 (25.0) and 10 (30.0)
        assert!((at_7.hrv - 27.0).abs() < 1e-9);
        // heart rate samples at 6 (66.0) and 8 (68.0)
        assert!((at_7.heart_rate - 67.0).abs() < 1e-9);

        for row in &rows {
            assert_eq!(Some(row.heart_rate), interpolate_at(&raw.heart_rate, row.time));
        }
    }

    #[test]
    fn corrupt_first_respiration_epoch_never_reaches_output() {
        let raw = night();
        assert_eq!(raw.respiration.first_time(), Some(at(2)));

        let rows = SleepAligner::align(&raw).unwrap();
        assert!(rows.iter().all(|r| r.respiration != 99.0));
        assert!(rows.iter().all(|r| r.respiration >= 12.0 && r.respiration <= 17.0));
    }

    #[test]
    fn sub_minute_timestamps_are_floored() {
        let mut raw = night();
        raw.hrv = raw.hrv.map_times(|t| t + TimeDelta::seconds(42));
        let rows = SleepAligner::align(&raw).unwrap();
        assert_eq!(rows.first().unwrap().time, at(5));
    }

    #[test]
    fn stage_does_not_bound_window() {
        let mut raw = night();
        raw.sleep_stage = Series::from_pairs([(at(60), SleepStage::Deep)]);
        let rows = SleepAligner::align(&raw).unwrap();
        assert_eq!(rows.first().unwrap().time, at(5));
        assert_eq!(rows.first().unwrap().sleep_stage, SleepStage::PLACEHOLDER);
        assert_eq!(rows.last().unwrap().sleep_stage, SleepStage::Deep);
    }

    #[test]
    fn empty_metric_is_an_error() {
        let mut raw = night();
        raw.hrv = Series::default();
        assert_eq!(
            SleepAligner::align(&raw),
            Err(AlignError::EmptySeries(SleepMetric::Hrv))
        );

        let mut raw = night();
        raw.sleep_stage = Series::default();
        assert_eq!(
            SleepAligner::align(&raw),
            Err(AlignError::EmptySeries(SleepMetric::SleepStage))
        );
    }

    #[test]
    fn respiration_without_samples_is_an_error() {
        let mut raw = night();
        raw.respiration = Series::default();
        assert_eq!(
            SleepAligner::align(&raw),
            Err(AlignError::EmptySeries(SleepMetric::Respiration))
        );
    }

    #[test]
    fn disjoint_metrics_do_not_overlap() {
        let mut raw = night();
        raw.heart_rate = every(2, 200, 240, |_| 60.0);
        assert!(matches!(
            SleepAligner::align(&raw),
            Err(AlignError::NoOverlap { .. })
        ));
    }

    #[test]
    fn random_nights_hold_window_and_fill_rules() {
        let mut rng = rand::rng();

        for _ in 0..50 {
            let offsets: Vec<i64> = (0..4).map(|_| rng.random_range(0..30)).collect();
            let lengths: Vec<i64> = (0..4).map(|_| rng.random_range(200..400)).collect();
            let first_stage = rng.random_range(0..60);

            let raw = RawSleep {
                heart_rate: every(2, offsets[0], offsets[0] + lengths[0], |m| 55.0 + (m % 7) as f64),
                movement: every(1, offsets[1], offsets[1] + lengths[1], |m| (m % 4) as f64),
                hrv: every(5, offsets[2], offsets[2] + lengths[2], |m| 30.0 + (m % 11) as f64),
                respiration: every(2, offsets[3], offsets[3] + lengths[3], |m| 13.0 + (m % 3) as f64),
                sleep_stage: Series::from_pairs([(at(first_stage), SleepStage::Deep)]),
            };

            let normalized = SleepAligner::normalize(&raw);
            let series = [
                &normalized.heart_rate,
                &normalized.movement,
                &normalized.hrv,
                &normalized.respiration,
            ];
            let start = series.iter().filter_map(|s| s.first_time()).max().unwrap();
            let end = series.iter().filter_map(|s| s.last_time()).min().unwrap();

            let rows = SleepAligner::align(&raw).unwrap();
            assert_eq!(rows.first().unwrap().time, start);
            assert_eq!(rows.last().unwrap().time, end);
            assert_eq!(rows.len() as i64, (end - start).num_minutes() + 1);

            for row in &rows {
                let expected = if row.time < at(first_stage) {
                    SleepStage::PLACEHOLDER
                } else {
                    SleepStage::Deep
                };
                assert_eq!(row.sleep_stage, expected);
            }
        }
    }
}
