//! Statistics calculation engine.
//!
//! Computes derived metrics from a snapshot of stored scores:
//! - Season windows (academic year starting in April)
//! - Grouped averages, bests and counts
//! - Tie-aware leaderboard ranks
//! - Gap-preserving chart series
//! - Per-season match rosters and team totals
//!
//! Everything here is a pure function of its inputs.

pub mod aggregate;
pub mod match_history;
pub mod ranking;
pub mod season;
pub mod style;
pub mod timeseries;

use std::collections::HashMap;

use crate::models::{Gender, Player, PlayerId, Score};

pub use aggregate::{aggregate_by, StatsAccumulator};
pub use match_history::{MatchHistory, MatchHistoryAggregator, MatchResult, RosterKey, SeasonRoster};
pub use ranking::{rank_of, Leaderboard};
pub use season::SeasonCalendar;
pub use timeseries::{Period, Reduction, TimeSeriesBuilder};

/// Round to one decimal place, the precision every displayed stat uses.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// A score joined with its owning player.
#[derive(Debug, Clone, Copy)]
pub struct ScoreView<'a> {
    pub score: &'a Score,
    pub player: &'a Player,
}

impl<'a> ScoreView<'a> {
    /// The player's division, if recognized.
    pub fn gender(&self) -> Option<Gender> {
        self.player.gender
    }
}

/// Join scores to their players. Scores whose player is missing are dropped.
pub fn join<'a>(players: &'a [Player], scores: &'a [Score]) -> Vec<ScoreView<'a>> {
    let by_id: HashMap<&PlayerId, &Player> = players.iter().map(|p| (&p.id, p)).collect();

    scores
        .iter()
        .filter_map(|score| {
            by_id
                .get(&score.player_id)
                .map(|player| ScoreView { score, player })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use crate::models::{Category, Gender, NewScore, Player, Score};

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn player(name: &str, gender: Option<Gender>) -> Player {
        Player::new(name.to_string(), gender, Some(2022))
    }

    /// A score whose total is exactly `total` (spread over the first series).
    pub fn score(
        player: &Player,
        date: NaiveDate,
        match_name: &str,
        category: &str,
        event: &str,
        total: f64,
        seq: u64,
    ) -> Score {
        Score::from_new(
            NewScore {
                player_id: player.id.clone(),
                date,
                match_name: match_name.to_string(),
                category: Category::from(category),
                event_name: event.to_string(),
                series: [total, 0.0, 0.0, 0.0, 0.0, 0.0],
                reported_total: None,
            },
            seq,
        )
    }
}
