use chrono::NaiveDateTime;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample<T> {
    pub time: NaiveDateTime,
    pub value: T,
}

impl<T> Sample<T> {
    pub fn new(time: NaiveDateTime, value: T) -> Self {
        Self { time, value }
    }
}

/// Time-indexed samples of one metric, strictly increasing in time.
#[derive(Clone, Debug, PartialEq)]
pub struct Series<T> {
    samples: Vec<Sample<T>>,
}

impl<T> Default for Series<T> {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
        }
    }
}

impl<T: Copy> Series<T> {
    /// Sorts by time and collapses duplicate timestamps; the sample given
    /// last for a timestamp wins.
    pub fn new(mut samples: Vec<Sample<T>>) -> Self {
        samples.sort_by_key(|s| s.time);

        let mut unique: Vec<Sample<T>> = Vec::with_capacity(samples.len());
        for sample in samples {
            match unique.last_mut() {
                Some(last) if last.time == sample.time => *last = sample,
                _ => unique.push(sample),
            }
        }

        Self { samples: unique }
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDateTime, T)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(time, value)| Sample::new(time, value))
                .collect(),
        )
    }

    pub fn samples(&self) -> &[Sample<T>] {
        &self.samples
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample<T>> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first_time(&self) -> Option<NaiveDateTime> {
        self.samples.first().map(|s| s.time)
    }

    pub fn last_time(&self) -> Option<NaiveDateTime> {
        self.samples.last().map(|s| s.time)
    }

    /// Rewrites every timestamp, re-establishing order and uniqueness.
    pub fn map_times<F>(&self, f: F) -> Self
    where
        F: Fn(NaiveDateTime) -> NaiveDateTime,
    {
        Self::new(
            self.samples
                .iter()
                .map(|s| Sample::new(f(s.time), s.value))
                .collect(),
        )
    }

    /// Keeps samples with `start <= time <= end`.
    pub fn clip(&self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            samples: self
                .samples
                .iter()
                .filter(|s| s.time >= start && s.time <= end)
                .copied()
                .collect(),
        }
    }

    /// Union of two series; on equal timestamps `other` wins.
    pub fn merged_with(&self, other: &Series<T>) -> Self {
        Self::new(
            self.samples
                .iter()
                .chain(other.samples.iter())
                .copied()
                .collect(),
        )
    }
}
