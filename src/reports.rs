//! Read models served by the CLI and the HTTP API.
//!
//! Each report takes one snapshot of the store and derives everything from
//! it with the `calculate` engine, so a report never mixes two states.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculate::style::{event_style, gender_style};
use crate::calculate::timeseries::trailing_window_start;
use crate::calculate::{
    aggregate_by, Leaderboard, MatchHistory, MatchHistoryAggregator, MatchResult,
    Period, Reduction, ScoreView, TimeSeriesBuilder,
};
use crate::config::AppConfig;
use crate::models::{
    normalize_name, ChartData, DateRange, Gender, GroupStats, Player, PlayerId, Score, TeamGoal,
};
use crate::storage::{PlayerFilter, RecordStore, ScoreFilter, Snapshot, StorageError};

/// Dashboard player filters. Empty strings count as unset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub name: Option<String>,
    pub year: Option<i32>,
    pub gender: Option<Gender>,
    #[serde(rename = "match")]
    pub match_name: Option<String>,
    #[serde(rename = "event")]
    pub event_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventGenderStats {
    pub event_name: String,
    pub gender: Gender,
    #[serde(flatten)]
    pub stats: GroupStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventChart {
    pub event_name: String,
    pub chart: ChartData,
}

/// A score with its player's name, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreEntry {
    pub player_name: String,
    #[serde(flatten)]
    pub score: Score,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub goals: Vec<TeamGoal>,
    /// All-time stats for every dashboard event and gender, zero when empty
    pub summary: Vec<EventGenderStats>,
    /// Monthly average per gender over the trailing window; every chart
    /// shares one label axis
    pub charts: Vec<EventChart>,
    pub players: Vec<Player>,
    pub years: Vec<i32>,
    pub matches: Vec<String>,
    pub events: Vec<String>,
    pub recent: Vec<ScoreEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerEventSummary {
    pub event_name: String,
    pub max: f64,
    pub avg: f64,
    pub count: u32,
    pub rank_best: Option<u32>,
    pub rank_avg: Option<u32>,
    pub total_players: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlayerReport {
    pub player: Player,
    pub scores: Vec<Score>,
    pub summary: Vec<PlayerEventSummary>,
    /// Last total of each day per event
    pub progress: ChartData,
    pub goals: Vec<TeamGoal>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
    pub rank: u32,
    pub player_id: PlayerId,
    pub name: String,
    pub entry_year: Option<i32>,
    pub avg: f64,
    pub max: f64,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingTable {
    pub event_name: String,
    pub gender: Gender,
    pub by_avg: Vec<RankingEntry>,
    pub by_max: Vec<RankingEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankingReport {
    /// First year of the current season
    pub season: i32,
    pub current: Vec<RankingTable>,
    pub all_time: Vec<RankingTable>,
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn scores_of<'a>(views: &[ScoreView<'a>], match_name: &str) -> Vec<ScoreView<'a>> {
    views
        .iter()
        .filter(|v| v.score.match_name == match_name)
        .copied()
        .collect()
}

/// Team goals for the dashboard events, creating missing ones with their
/// configured default.
pub async fn dashboard_goals(
    store: &dyn RecordStore,
    config: &AppConfig,
) -> Result<Vec<TeamGoal>, StorageError> {
    let mut goals = Vec::new();
    for event in &config.events.dashboard {
        for gender in Gender::ALL {
            goals.push(
                store
                    .get_or_create_team_goal(event, gender, config.default_goal(event))
                    .await?,
            );
        }
    }
    Ok(goals)
}

pub async fn dashboard(
    store: &dyn RecordStore,
    config: &AppConfig,
    query: &DashboardQuery,
) -> Result<DashboardReport, StorageError> {
    let goals = dashboard_goals(store, config).await?;
    let snapshot = store.snapshot().await?;
    let views = snapshot.views();

    // Players of unspecified gender have no (event, gender) group
    let by_event_gender = aggregate_by(&views, &DateRange::all(), |v| {
        Some((v.score.event_name.clone(), v.gender()?))
    });

    let mut summary = Vec::new();
    for event in &config.events.dashboard {
        for gender in Gender::ALL {
            summary.push(EventGenderStats {
                event_name: event.clone(),
                gender,
                stats: by_event_gender
                    .get(&(event.clone(), gender))
                    .copied()
                    .unwrap_or_default(),
            });
        }
    }

    let charts = monthly_charts(&snapshot, &views, config);
    let players = filtered_players(&snapshot, query);

    let years: BTreeSet<i32> = snapshot.players.iter().filter_map(|p| p.entry_year).collect();
    let mut matches: Vec<String> = snapshot
        .scores
        .iter()
        .map(|s| s.match_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    config.order_match_names(&mut matches);
    let events: BTreeSet<String> = snapshot.scores.iter().map(|s| s.event_name.clone()).collect();

    let names: HashMap<&PlayerId, &str> = snapshot
        .players
        .iter()
        .map(|p| (&p.id, p.name.as_str()))
        .collect();
    let recent = snapshot
        .recent_scores(config.import.recent_limit)
        .into_iter()
        .map(|score| ScoreEntry {
            player_name: names.get(&score.player_id).copied().unwrap_or_default().to_string(),
            score,
        })
        .collect();

    Ok(DashboardReport {
        goals,
        summary,
        charts,
        players,
        years: years.into_iter().rev().collect(),
        matches,
        events: events.into_iter().collect(),
        recent,
    })
}

fn monthly_charts(snapshot: &Snapshot, views: &[ScoreView<'_>], config: &AppConfig) -> Vec<EventChart> {
    let latest = snapshot.scores.iter().map(|s| s.date).max();
    let start = trailing_window_start(
        latest,
        config.charts.window_years,
        config.charts.fallback_start,
    );
    debug!("Dashboard chart window starts {}", start);

    let mut builder = TimeSeriesBuilder::new(Period::Month, Reduction::Mean);
    for view in views {
        if view.score.date < start || !config.events.dashboard.contains(&view.score.event_name) {
            continue;
        }
        if let Some(gender) = view.gender() {
            builder.push(view.score.date, (view.score.event_name.clone(), gender), view.score.total);
        }
    }

    config
        .events
        .dashboard
        .iter()
        .map(|event| {
            let keys: Vec<(String, Gender)> =
                Gender::ALL.iter().map(|g| (event.clone(), *g)).collect();
            let chart = builder.build(&keys, |(event, gender), _| {
                (gender.to_string(), gender_style(event, *gender))
            });
            EventChart {
                event_name: event.clone(),
                chart,
            }
        })
        .collect()
}

/// Store-side filters first, then the space-insensitive name match.
pub fn filtered_players(snapshot: &Snapshot, query: &DashboardQuery) -> Vec<Player> {
    let filter = PlayerFilter {
        entry_year: query.year,
        gender: query.gender,
        match_name: non_empty(&query.match_name),
        event_name: non_empty(&query.event_name),
    };
    let mut players = snapshot.players_matching(&filter);

    if let Some(name) = non_empty(&query.name) {
        let needle = normalize_name(&name);
        players.retain(|p| normalize_name(&p.name).contains(&needle));
    }
    players
}

pub async fn player_report(
    store: &dyn RecordStore,
    config: &AppConfig,
    player_id: &PlayerId,
) -> Result<Option<PlayerReport>, StorageError> {
    let snapshot = store.snapshot().await?;
    let Some(player) = snapshot.players.iter().find(|p| &p.id == player_id).cloned() else {
        return Ok(None);
    };
    let views = snapshot.views();

    // Leaderboards span every player of every gender
    let per_player = aggregate_by(&views, &DateRange::all(), |v| {
        Some((v.score.event_name.clone(), v.player.id.clone()))
    });
    let mut best_values: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let mut avg_values: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for ((event, _), stats) in &per_player {
        best_values.entry(event.as_str()).or_default().push(stats.max);
        avg_values.entry(event.as_str()).or_default().push(stats.avg);
    }
    let best_boards: BTreeMap<&str, Leaderboard> = best_values
        .into_iter()
        .map(|(e, v)| (e, Leaderboard::new(v)))
        .collect();
    let avg_boards: BTreeMap<&str, Leaderboard> = avg_values
        .into_iter()
        .map(|(e, v)| (e, Leaderboard::new(v)))
        .collect();

    let mut own: Vec<ScoreView<'_>> = views
        .iter()
        .filter(|v| v.player.id == player.id)
        .copied()
        .collect();
    own.sort_by_key(|v| v.score.date);

    let mut event_order: Vec<String> = Vec::new();
    for view in &own {
        if !event_order.contains(&view.score.event_name) {
            event_order.push(view.score.event_name.clone());
        }
    }
    let mut sorted_events = event_order.clone();
    config.sort_events(&mut sorted_events);

    let summary = sorted_events
        .iter()
        .filter_map(|event| {
            let stats = per_player.get(&(event.clone(), player.id.clone()))?;
            let best = best_boards.get(event.as_str());
            let avg = avg_boards.get(event.as_str());
            Some(PlayerEventSummary {
                event_name: event.clone(),
                max: stats.max,
                avg: stats.avg,
                count: stats.count,
                rank_best: best.and_then(|b| b.rank_of(stats.max)),
                rank_avg: avg.and_then(|b| b.rank_of(stats.avg)),
                total_players: best.map_or(0, Leaderboard::total_players),
            })
        })
        .collect();

    let mut progress = TimeSeriesBuilder::new(Period::Day, Reduction::Last);
    for view in &own {
        progress.push(view.score.date, view.score.event_name.clone(), view.score.total);
    }
    let progress = progress.build(&event_order, |event, i| (event.clone(), event_style(event, i)));

    let goals = match player.gender {
        Some(gender) => store.list_team_goals(Some(gender)).await?,
        None => Vec::new(),
    };

    Ok(Some(PlayerReport {
        scores: own.iter().map(|v| v.score.clone()).collect(),
        player,
        summary,
        progress,
        goals,
    }))
}

fn ranking_tables(views: &[ScoreView<'_>], range: &DateRange, events: &[String]) -> Vec<RankingTable> {
    let stats_by_player = aggregate_by(views, range, |v| {
        Some((v.score.event_name.clone(), v.gender()?, v.player.id.clone()))
    });
    let players: HashMap<&PlayerId, &Player> = views.iter().map(|v| (&v.player.id, v.player)).collect();

    let mut tables = Vec::new();
    for event in events {
        for gender in Gender::ALL {
            let entries: Vec<(&Player, GroupStats)> = stats_by_player
                .iter()
                .filter(|((e, g, _), _)| e == event && *g == gender)
                .filter_map(|((_, _, id), stats)| players.get(id).map(|p| (*p, *stats)))
                .collect();

            let by_avg = ranked(&entries, |s| s.avg);
            let by_max = ranked(&entries, |s| s.max);
            tables.push(RankingTable {
                event_name: event.clone(),
                gender,
                by_avg,
                by_max,
            });
        }
    }
    tables
}

/// Sort by `metric` descending and assign tie-aware ranks.
fn ranked<F>(entries: &[(&Player, GroupStats)], metric: F) -> Vec<RankingEntry>
where
    F: Fn(&GroupStats) -> f64,
{
    let board = Leaderboard::new(entries.iter().map(|(_, s)| metric(s)));
    let mut ranked: Vec<RankingEntry> = entries
        .iter()
        .filter_map(|(player, stats)| {
            Some(RankingEntry {
                rank: board.rank_of(metric(stats))?,
                player_id: player.id.clone(),
                name: player.name.clone(),
                entry_year: player.entry_year,
                avg: stats.avg,
                max: stats.max,
                count: stats.count,
            })
        })
        .collect();
    ranked.sort_by(|a, b| a.rank.cmp(&b.rank).then_with(|| a.name.cmp(&b.name)));
    ranked
}

pub async fn ranking(
    store: &dyn RecordStore,
    config: &AppConfig,
    today: NaiveDate,
) -> Result<RankingReport, StorageError> {
    let snapshot = store.snapshot().await?;
    let views = snapshot.views();
    let calendar = config.calendar();
    let events = &config.events.dashboard;

    Ok(RankingReport {
        season: calendar.fiscal_year_of(today),
        current: ranking_tables(
            &views,
            &DateRange::since(calendar.current_season_start(today)),
            events,
        ),
        all_time: ranking_tables(&views, &DateRange::all(), events),
    })
}

/// Distinct competition names in display order.
pub async fn match_names(
    store: &dyn RecordStore,
    config: &AppConfig,
) -> Result<Vec<String>, StorageError> {
    let scores = store.list_scores(&ScoreFilter::default()).await?;
    let mut names: Vec<String> = scores
        .into_iter()
        .map(|s| s.match_name)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    config.order_match_names(&mut names);
    Ok(names)
}

/// Season rosters and team totals of one competition. `None` when the
/// competition has no scores.
pub async fn match_history(
    store: &dyn RecordStore,
    config: &AppConfig,
    match_name: &str,
) -> Result<Option<MatchHistory>, StorageError> {
    let snapshot = store.snapshot().await?;
    let views = scores_of(&snapshot.views(), match_name);
    if views.is_empty() {
        return Ok(None);
    }

    let aggregator = MatchHistoryAggregator::new(config.calendar(), config.is_mixed_gender(match_name));
    Ok(Some(aggregator.history(match_name, &views)))
}

/// Results of one competition in one season.
pub async fn match_result(
    store: &dyn RecordStore,
    config: &AppConfig,
    match_name: &str,
    season: i32,
) -> Result<MatchResult, StorageError> {
    let snapshot = store.snapshot().await?;
    let views = scores_of(&snapshot.views(), match_name);

    let aggregator = MatchHistoryAggregator::new(config.calendar(), config.is_mixed_gender(match_name));
    let mut result = aggregator.result(match_name, season, &views, config.team_events_for(match_name));

    let order = |name: &str| {
        config
            .events
            .display_order
            .iter()
            .position(|o| o == name)
            .unwrap_or(usize::MAX)
    };
    result.individual.sort_by(|a, b| {
        order(&a.event_name)
            .cmp(&order(&b.event_name))
            .then_with(|| a.event_name.cmp(&b.event_name))
    });
    Ok(result)
}
