use chrono::{Days, NaiveDate};

/// The night being processed, fixed once per run and handed to both
/// fetchers.
///
/// `sleep_date` is the calendar day on whose morning the night ends; the
/// night itself starts on the evening before. Weather is therefore needed for
/// `sleep_date - 1` and `sleep_date`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SleepWindow {
    sleep_date: NaiveDate,
    today: NaiveDate,
}

impl SleepWindow {
    /// `None` when `sleep_date` lies in the future.
    pub fn new(sleep_date: NaiveDate, today: NaiveDate) -> Option<Self> {
        (sleep_date <= today).then_some(Self { sleep_date, today })
    }

    pub fn yesterday(today: NaiveDate) -> Self {
        let sleep_date = today.pred_opt().unwrap_or(today);
        Self { sleep_date, today }
    }

    pub fn sleep_date(&self) -> NaiveDate {
        self.sleep_date
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Whole days between the night and the day of the request.
    pub fn day_offset(&self) -> u64 {
        (self.today - self.sleep_date).num_days().unsigned_abs()
    }

    /// Past days to request so the window starts on `sleep_date - 1`.
    pub fn past_days(&self) -> u64 {
        self.day_offset() + 1
    }

    /// When the night ends today, today's data only exists as forecast.
    pub fn forecast_days(&self) -> u64 {
        if self.day_offset() == 0 { 1 } else { 0 }
    }

    /// First and last calendar day the weather request covers.
    pub fn weather_dates(&self) -> (NaiveDate, NaiveDate) {
        let first = self
            .today
            .checked_sub_days(Days::new(self.past_days()))
            .unwrap_or(self.today);
        let last = if self.forecast_days() > 0 {
            self.today
        } else {
            self.today.pred_opt().unwrap_or(self.today)
        };
        (first, last)
    }
}
