//! Score records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{EntityId, PlayerId, ScoreId};

/// Number of series (sub-scores) in a match.
pub const SERIES_COUNT: usize = 6;

const REGULAR: &str = "Regular";

/// Score classification.
///
/// `Regular` scores count toward team rosters and team totals. Every other
/// category keeps its original text and only counts toward personal stats.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Regular,
    Other(String),
}

impl Category {
    pub fn is_regular(&self) -> bool {
        matches!(self, Category::Regular)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Regular => REGULAR,
            Category::Other(s) => s,
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        if s.trim() == REGULAR {
            Category::Regular
        } else {
            Category::Other(s)
        }
    }
}

impl From<&str> for Category {
    fn from(s: &str) -> Self {
        Category::from(s.to_string())
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        match c {
            Category::Regular => REGULAR.to_string(),
            Category::Other(s) => s,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One shooter's result in one event on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Unique identifier
    pub id: ScoreId,

    /// Owning player
    pub player_id: PlayerId,

    /// Competition date
    pub date: NaiveDate,

    /// Competition name
    pub match_name: String,

    /// Team-scoring classification
    pub category: Category,

    /// Event (AR60, SB3x20, P60, AP60, BP, ...)
    pub event_name: String,

    /// Series scores s1..s6
    pub series: [f64; SERIES_COUNT],

    /// Match total
    pub total: f64,
}

/// Fields needed to create a score. The ID is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewScore {
    pub player_id: PlayerId,
    pub date: NaiveDate,
    pub match_name: String,
    pub category: Category,
    pub event_name: String,
    pub series: [f64; SERIES_COUNT],

    /// Total as reported by the source, which may differ from the series
    /// sum (e.g. handicap rules). Absent or zero falls back to the sum.
    pub reported_total: Option<f64>,
}

impl Score {
    /// Materialize a score. `seq` disambiguates otherwise identical rows.
    pub fn from_new(new: NewScore, seq: u64) -> Self {
        let total = resolve_total(&new.series, new.reported_total);
        let id = EntityId::score(&new.player_id, new.date, &new.match_name, &new.event_name, seq);

        Self {
            id,
            player_id: new.player_id,
            date: new.date,
            match_name: new.match_name,
            category: new.category,
            event_name: new.event_name,
            series: new.series,
            total,
        }
    }

    /// Replace the series scores. The total is always recomputed.
    pub fn set_series(&mut self, series: [f64; SERIES_COUNT]) {
        self.series = series;
        self.total = series_sum(&series);
    }
}

/// Sum of the series scores.
pub fn series_sum(series: &[f64; SERIES_COUNT]) -> f64 {
    series.iter().sum()
}

/// Reject series or totals that are NaN or infinite.
pub fn check_finite(series: &[f64; SERIES_COUNT], reported: Option<f64>) -> Result<(), String> {
    if let Some(pos) = series.iter().position(|s| !s.is_finite()) {
        return Err(format!("S{} is not a number: {}", pos + 1, series[pos]));
    }
    match reported {
        Some(t) if !t.is_finite() => Err(format!("total is not a number: {}", t)),
        _ => Ok(()),
    }
}

/// Pick the stored total: an explicit non-zero total wins, otherwise the sum.
pub fn resolve_total(series: &[f64; SERIES_COUNT], reported: Option<f64>) -> f64 {
    match reported {
        Some(t) if t.is_finite() && t != 0.0 => t,
        _ => series_sum(series),
    }
}
