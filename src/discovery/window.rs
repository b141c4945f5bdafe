use crate::{Error, Result};
use chrono::{Datelike, Days, Local, NaiveDate};
use std::fmt;

/// Inclusive publication date window `[start, end]`, compared as calendar dates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidInput {
                field: "date_window".to_string(),
                reason: format!("start {start} is after end {end}"),
            });
        }
        Ok(Self { start, end })
    }

    /// `[end - days_back, end]`
    pub fn ending_on(end: NaiveDate, days_back: u32) -> Result<Self> {
        let start = end
            .checked_sub_days(Days::new(u64::from(days_back)))
            .ok_or_else(|| Error::InvalidInput {
                field: "days_back".to_string(),
                reason: format!("{days_back} days before {end} is out of the calendar range"),
            })?;
        Ok(Self { start, end })
    }

    /// `[today - days_back, today]` in local time
    pub fn ending_today(days_back: u32) -> Result<Self> {
        Self::ending_on(Local::now().date_naive(), days_back)
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Coarse `year` filter for the search API, which has no day granularity
    #[must_use]
    pub fn year_filter(&self) -> String {
        if self.start.year() == self.end.year() {
            self.start.year().to_string()
        } else {
            format!("{}-{}", self.start.year(), self.end.year())
        }
    }

    /// `<start>_<end>`, used to name the per-run papers folder
    #[must_use]
    pub fn folder_label(&self) -> String {
        format!("{}_{}", self.start, self.end)
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}
