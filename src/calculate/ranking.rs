//! Leaderboard ranks with shared ranks for ties.
//!
//! Ranking is standard competition ranking: tied entries all take the rank of
//! the best-placed member of the tie, and the next distinct value skips past
//! them (650, 620, 620, 600 ranks as 1, 2, 2, 4).

use std::cmp::Ordering;

/// Rank of `value` in a leaderboard sorted best-first.
///
/// The rank is one plus the index of the first entry equal to `value`.
/// Returns `None` when the value is not on the leaderboard.
pub fn rank_of(sorted_desc: &[f64], value: f64) -> Option<u32> {
    sorted_desc
        .iter()
        .position(|v| *v == value)
        .map(|i| i as u32 + 1)
}

/// Sort best-first. NaN sorts last.
pub fn sort_desc(values: &mut [f64]) {
    values.sort_by(|a, b| b.partial_cmp(a).unwrap_or_else(|| nan_last(a, b)));
}

fn nan_last(a: &f64, b: &f64) -> Ordering {
    a.is_nan().cmp(&b.is_nan())
}

/// The values of one statistic for one category, best-first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaderboard {
    values: Vec<f64>,
}

impl Leaderboard {
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        let mut values: Vec<f64> = values.into_iter().collect();
        sort_desc(&mut values);
        Self { values }
    }

    pub fn rank_of(&self, value: f64) -> Option<u32> {
        rank_of(&self.values, value)
    }

    /// Number of entries (players) on the leaderboard.
    pub fn total_players(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}
