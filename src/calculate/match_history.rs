//! Per-season history of one competition.
//!
//! Only `Regular` scores form the team: rosters list who shot for the team
//! in each season, and team totals add up their scores. Mixed-gender
//! competitions group by event alone; all others split by gender, and
//! players with an unrecognized gender are left out of the split.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{ChartData, DateRange, Gender, PlayerId, SERIES_COUNT};

use super::season::SeasonCalendar;
use super::style::team_style;
use super::timeseries::{Period, Reduction, TimeSeriesBuilder};
use super::{round1, ScoreView};

/// Team grouping key: event, plus gender unless the match is mixed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RosterKey {
    pub event_name: String,
    pub gender: Option<Gender>,
}

impl RosterKey {
    /// `AR60` for mixed keys, `AR60 female` otherwise.
    pub fn label(&self) -> String {
        match self.gender {
            Some(g) => format!("{} {}", self.event_name, g),
            None => self.event_name.clone(),
        }
    }
}

/// Players who shot `Regular` for one key in one season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterEntry {
    pub label: String,
    pub event_name: String,
    pub gender: Option<Gender>,

    /// Distinct names, in order of first appearance (latest score first)
    pub players: Vec<String>,
}

/// Table row: one season of a competition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonRoster {
    pub season: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub regulars: Vec<RosterEntry>,
}

/// Roster table (latest season first) and team-total chart (oldest first).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchHistory {
    pub match_name: String,
    pub mixed_gender: bool,
    pub seasons: Vec<SeasonRoster>,
    pub chart: ChartData,
}

/// One shooter's line in a match result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberScore {
    pub player_id: PlayerId,
    pub name: String,
    pub gender: Option<Gender>,
    pub date: NaiveDate,
    pub series: [f64; SERIES_COUNT],
    pub total: f64,
}

impl MemberScore {
    fn from_view(view: &ScoreView<'_>) -> Self {
        Self {
            player_id: view.player.id.clone(),
            name: view.player.name.clone(),
            gender: view.player.gender,
            date: view.score.date,
            series: view.score.series,
            total: view.score.total,
        }
    }
}

/// A team's combined result in one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamResult {
    pub event_name: String,
    pub total: f64,
    pub members: Vec<MemberScore>,
}

/// All scores of one event, best first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventResults {
    pub event_name: String,
    pub entries: Vec<MemberScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Mixed,
    Separate,
}

/// One competition in one season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub match_name: String,
    pub season: i32,
    pub display_mode: DisplayMode,
    pub team_male: Vec<TeamResult>,
    pub team_female: Vec<TeamResult>,
    pub team_mixed: Vec<TeamResult>,
    pub individual: Vec<EventResults>,
}

/// Builds match history and match results for one competition.
#[derive(Debug, Clone, Copy)]
pub struct MatchHistoryAggregator {
    calendar: SeasonCalendar,
    mixed_gender: bool,
}

impl MatchHistoryAggregator {
    pub fn new(calendar: SeasonCalendar, mixed_gender: bool) -> Self {
        Self {
            calendar,
            mixed_gender,
        }
    }

    /// Team key for a score, or `None` if it does not count for the team.
    pub fn key_for(&self, view: &ScoreView<'_>) -> Option<RosterKey> {
        if !view.score.category.is_regular() {
            return None;
        }
        let gender = if self.mixed_gender {
            None
        } else {
            Some(view.gender()?)
        };
        Some(RosterKey {
            event_name: view.score.event_name.clone(),
            gender,
        })
    }

    /// Season table and team-total chart from the competition's scores.
    pub fn history(&self, match_name: &str, views: &[ScoreView<'_>]) -> MatchHistory {
        let mut ordered: Vec<&ScoreView<'_>> = views.iter().collect();
        ordered.sort_by(|a, b| b.score.date.cmp(&a.score.date));

        let mut seasons: BTreeMap<i32, (NaiveDate, NaiveDate, BTreeMap<RosterKey, Vec<String>>)> =
            BTreeMap::new();
        let mut totals = TimeSeriesBuilder::new(Period::Season(self.calendar), Reduction::Sum);

        for view in ordered {
            let date = view.score.date;
            let season = self.calendar.fiscal_year_of(date);
            let (start, end, regulars) = seasons
                .entry(season)
                .or_insert_with(|| (date, date, BTreeMap::new()));
            *start = (*start).min(date);
            *end = (*end).max(date);

            if let Some(key) = self.key_for(view) {
                let names = regulars.entry(key.clone()).or_default();
                if !names.contains(&view.player.name) {
                    names.push(view.player.name.clone());
                }
                totals.push(date, key, view.score.total);
            }
        }

        let seasons = seasons
            .into_iter()
            .rev()
            .map(|(season, (start_date, end_date, regulars))| SeasonRoster {
                season,
                start_date,
                end_date,
                regulars: regulars
                    .into_iter()
                    .map(|(key, players)| RosterEntry {
                        label: key.label(),
                        event_name: key.event_name,
                        gender: key.gender,
                        players,
                    })
                    .collect(),
            })
            .collect();

        let keys = totals.keys();
        let chart = totals.build(&keys, |key, _| {
            (key.label(), team_style(&key.event_name, key.gender))
        });

        MatchHistory {
            match_name: match_name.to_string(),
            mixed_gender: self.mixed_gender,
            seasons,
            chart,
        }
    }

    /// Team and individual results of the competition in `season`.
    /// Team results are limited to `team_events`.
    pub fn result(
        &self,
        match_name: &str,
        season: i32,
        views: &[ScoreView<'_>],
        team_events: &[String],
    ) -> MatchResult {
        let range = DateRange::between(self.calendar.start_of(season), self.calendar.end_of(season));
        let in_season: Vec<&ScoreView<'_>> = views
            .iter()
            .filter(|v| range.contains(v.score.date))
            .collect();

        let mut individual: BTreeMap<String, Vec<MemberScore>> = BTreeMap::new();
        let mut teams: BTreeMap<RosterKey, TeamResult> = BTreeMap::new();

        for view in &in_season {
            individual
                .entry(view.score.event_name.clone())
                .or_default()
                .push(MemberScore::from_view(view));

            let Some(key) = self.key_for(view) else {
                continue;
            };
            if !team_events.contains(&key.event_name) {
                continue;
            }
            let team = teams.entry(key.clone()).or_insert_with(|| TeamResult {
                event_name: key.event_name.clone(),
                total: 0.0,
                members: Vec::new(),
            });
            team.total = round1(team.total + view.score.total);
            team.members.push(MemberScore::from_view(view));
        }

        let individual = individual
            .into_iter()
            .map(|(event_name, mut entries)| {
                entries.sort_by(|a, b| b.total.total_cmp(&a.total));
                EventResults {
                    event_name,
                    entries,
                }
            })
            .collect();

        let mut result = MatchResult {
            match_name: match_name.to_string(),
            season,
            display_mode: if self.mixed_gender {
                DisplayMode::Mixed
            } else {
                DisplayMode::Separate
            },
            team_male: Vec::new(),
            team_female: Vec::new(),
            team_mixed: Vec::new(),
            individual,
        };

        for (key, team) in teams {
            match key.gender {
                None => result.team_mixed.push(team),
                Some(Gender::Male) => result.team_male.push(team),
                Some(Gender::Female) => result.team_female.push(team),
            }
        }

        result
    }
}
