//! Season windows.
//!
//! A season is the team's competitive (academic) year. It starts on a fixed
//! month/day, April 1 by default, and ends the day before the next start.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Maps calendar dates onto seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCalendar {
    pub start_month: u32,
    pub start_day: u32,
}

impl Default for SeasonCalendar {
    fn default() -> Self {
        Self {
            start_month: 4,
            start_day: 1,
        }
    }
}

impl SeasonCalendar {
    /// Returns `None` if month/day do not form a date in every year
    /// (Feb 29 is rejected).
    pub fn new(start_month: u32, start_day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(2001, start_month, start_day)?;
        Some(Self {
            start_month,
            start_day,
        })
    }

    /// The season (identified by the year it starts in) containing `date`.
    pub fn fiscal_year_of(&self, date: NaiveDate) -> i32 {
        if (date.month(), date.day()) >= (self.start_month, self.start_day) {
            date.year()
        } else {
            date.year() - 1
        }
    }

    /// First day of the season containing `date`.
    pub fn season_start(&self, date: NaiveDate) -> NaiveDate {
        self.start_of(self.fiscal_year_of(date))
    }

    /// First day of the season containing `today`.
    pub fn current_season_start(&self, today: NaiveDate) -> NaiveDate {
        self.season_start(today)
    }

    /// First day of the season starting in `year`.
    pub fn start_of(&self, year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, self.start_month, self.start_day)
            .unwrap_or_else(|| clamp_to_month(year, self.start_month, self.start_day))
    }

    /// Last day of the season starting in `year`.
    pub fn end_of(&self, year: i32) -> NaiveDate {
        let next = self.start_of(year + 1);
        next.pred_opt().unwrap_or(next)
    }
}

/// Move `date` back `years` calendar years. Feb 29 lands on Feb 28 when the
/// target year is not a leap year.
pub fn years_before(date: NaiveDate, years: i32) -> NaiveDate {
    let year = date.year() - years;
    NaiveDate::from_ymd_opt(year, date.month(), date.day())
        .unwrap_or_else(|| clamp_to_month(year, date.month(), date.day()))
}

/// Largest valid day of `month` not after `day`.
fn clamp_to_month(year: i32, month: u32, day: u32) -> NaiveDate {
    (1..=day.min(31))
        .rev()
        .find_map(|d| NaiveDate::from_ymd_opt(year, month, d))
        .unwrap_or(NaiveDate::MIN)
}
