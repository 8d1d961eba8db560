//! Chart series bucketed by period.
//!
//! Values are collected into (period bucket, series key) cells. The label
//! axis is every bucket that received at least one value in any series, in
//! chronological order, and each series is laid out against that shared axis
//! with `None` where it has no value.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};

use crate::models::{ChartData, Dataset, SeriesStyle};

use super::season::{years_before, SeasonCalendar};
use super::round1;

/// Bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// `YYYY/MM/DD`
    Day,
    /// `YYYY/MM`
    Month,
    /// Season start year, `YYYY`
    Season(SeasonCalendar),
}

/// Chronologically ordered bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Bucket {
    year: i32,
    month: u32,
    day: u32,
}

impl Period {
    fn bucket(&self, date: NaiveDate) -> Bucket {
        match self {
            Period::Day => Bucket {
                year: date.year(),
                month: date.month(),
                day: date.day(),
            },
            Period::Month => Bucket {
                year: date.year(),
                month: date.month(),
                day: 0,
            },
            Period::Season(calendar) => Bucket {
                year: calendar.fiscal_year_of(date),
                month: 0,
                day: 0,
            },
        }
    }

    fn label(&self, bucket: &Bucket) -> String {
        match self {
            Period::Day => format!("{:04}/{:02}/{:02}", bucket.year, bucket.month, bucket.day),
            Period::Month => format!("{:04}/{:02}", bucket.year, bucket.month),
            Period::Season(_) => bucket.year.to_string(),
        }
    }
}

/// How values landing in the same cell are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Mean, rounded to one decimal place
    Mean,
    /// Running sum, rounded to one decimal place after every addition
    Sum,
    /// Most recently pushed value
    Last,
}

#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    sum: f64,
    count: u32,
    last: f64,
}

/// Collects dated values and lays them out as aligned chart series.
#[derive(Debug, Clone)]
pub struct TimeSeriesBuilder<K> {
    period: Period,
    reduction: Reduction,
    cells: BTreeMap<Bucket, BTreeMap<K, Cell>>,
}

impl<K: Ord + Clone> TimeSeriesBuilder<K> {
    pub fn new(period: Period, reduction: Reduction) -> Self {
        Self {
            period,
            reduction,
            cells: BTreeMap::new(),
        }
    }

    pub fn push(&mut self, date: NaiveDate, key: K, value: f64) {
        let cell = self
            .cells
            .entry(self.period.bucket(date))
            .or_default()
            .entry(key)
            .or_default();

        cell.sum = match self.reduction {
            Reduction::Sum => round1(cell.sum + value),
            _ => cell.sum + value,
        };
        cell.count += 1;
        cell.last = value;
    }

    /// Shared label axis, ascending.
    pub fn labels(&self) -> Vec<String> {
        self.cells.keys().map(|b| self.period.label(b)).collect()
    }

    /// Every series key that received a value, sorted.
    pub fn keys(&self) -> Vec<K> {
        let keys: BTreeSet<&K> = self.cells.values().flat_map(|row| row.keys()).collect();
        keys.into_iter().cloned().collect()
    }

    /// Values of one series aligned to `labels()`.
    pub fn series(&self, key: &K) -> Vec<Option<f64>> {
        self.cells
            .values()
            .map(|row| row.get(key).map(|cell| self.reduce(cell)))
            .collect()
    }

    /// Build a chart with one dataset per requested key, in the given order.
    /// Requested keys with no values at all still get an all-gap dataset.
    pub fn build<F>(&self, keys: &[K], mut describe: F) -> ChartData
    where
        F: FnMut(&K, usize) -> (String, SeriesStyle),
    {
        let datasets = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let (label, style) = describe(key, i);
                Dataset {
                    label,
                    data: self.series(key),
                    style,
                }
            })
            .collect();

        ChartData {
            labels: self.labels(),
            datasets,
        }
    }

    fn reduce(&self, cell: &Cell) -> f64 {
        match self.reduction {
            Reduction::Mean => round1(cell.sum / cell.count as f64),
            Reduction::Sum => cell.sum,
            Reduction::Last => cell.last,
        }
    }
}

/// Start of a trailing window of `years` ending at `latest`.
/// With no data the window starts at `fallback`.
pub fn trailing_window_start(latest: Option<NaiveDate>, years: u32, fallback: NaiveDate) -> NaiveDate {
    match latest {
        Some(date) => years_before(date, years as i32),
        None => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_monthly_mean_with_gap() {
        let mut b = TimeSeriesBuilder::new(Period::Month, Reduction::Mean);
        b.push(d(2024, 5, 3), "male", 600.0);
        b.push(d(2024, 5, 20), "male", 611.0);
        b.push(d(2024, 6, 1), "female", 590.0);
        b.push(d(2024, 7, 9), "male", 620.0);

        assert_eq!(b.labels(), vec!["2024/05", "2024/06", "2024/07"]);
        assert_eq!(b.series(&"male"), vec![Some(605.5), None, Some(620.0)]);
        assert_eq!(b.series(&"female"), vec![None, Some(590.0), None]);
    }

    #[test]
    fn test_labels_sort_chronologically_across_years() {
        let mut b = TimeSeriesBuilder::new(Period::Month, Reduction::Mean);
        b.push(d(2025, 1, 1), "x", 1.0);
        b.push(d(2024, 12, 1), "x", 1.0);
        b.push(d(2024, 2, 1), "x", 1.0);
        assert_eq!(b.labels(), vec!["2024/02", "2024/12", "2025/01"]);
    }

    #[test]
    fn test_requested_series_without_data_is_all_gaps() {
        let mut b = TimeSeriesBuilder::new(Period::Month, Reduction::Mean);
        b.push(d(2024, 5, 3), "male", 600.0);

        let chart = b.build(&["male", "female"], |k, _| {
            (k.to_string(), crate::calculate::style::event_style("AR60", 0))
        });
        assert_eq!(chart.labels, vec!["2024/05"]);
        assert_eq!(chart.dataset("female").unwrap().data, vec![None]);
        assert_eq!(chart.dataset("male").unwrap().data, vec![Some(600.0)]);
    }

    #[test]
    fn test_season_sum() {
        let cal = SeasonCalendar::default();
        let mut b = TimeSeriesBuilder::new(Period::Season(cal), Reduction::Sum);
        b.push(d(2024, 5, 1), "AR60", 600.1);
        b.push(d(2025, 2, 1), "AR60", 600.2);
        b.push(d(2025, 4, 1), "AR60", 590.0);

        assert_eq!(b.labels(), vec!["2024", "2025"]);
        assert_eq!(b.series(&"AR60"), vec![Some(1200.3), Some(590.0)]);
    }

    #[test]
    fn test_sum_rounds_after_every_addition() {
        let mut b = TimeSeriesBuilder::new(Period::Month, Reduction::Sum);
        for _ in 0..3 {
            b.push(d(2024, 5, 1), "x", 0.04);
        }
        assert_eq!(b.series(&"x"), vec![Some(0.0)]);
    }

    #[test]
    fn test_daily_last_value_wins() {
        let mut b = TimeSeriesBuilder::new(Period::Day, Reduction::Last);
        b.push(d(2024, 5, 1), "AR60", 600.0);
        b.push(d(2024, 5, 1), "AR60", 610.0);
        assert_eq!(b.labels(), vec!["2024/05/01"]);
        assert_eq!(b.series(&"AR60"), vec![Some(610.0)]);
    }

    #[test]
    fn test_keys_sorted_and_distinct() {
        let mut b = TimeSeriesBuilder::new(Period::Month, Reduction::Mean);
        b.push(d(2024, 5, 1), "b", 1.0);
        b.push(d(2024, 6, 1), "a", 1.0);
        b.push(d(2024, 6, 1), "b", 1.0);
        assert_eq!(b.keys(), vec!["a", "b"]);
    }

    #[test]
    fn test_trailing_window() {
        let fallback = d(2000, 1, 1);
        assert_eq!(trailing_window_start(None, 4, fallback), fallback);
        assert_eq!(
            trailing_window_start(Some(d(2025, 6, 30)), 4, fallback),
            d(2021, 6, 30)
        );
        assert_eq!(
            trailing_window_start(Some(d(2024, 2, 29)), 3, fallback),
            d(2021, 2, 28)
        );
    }
}
