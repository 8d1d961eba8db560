//! Record store for players, scores and team goals.

use std::collections::HashSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::calculate::{join, ScoreView};
use crate::models::{
    check_finite, DateRange, Gender, NewScore, Player, PlayerId, Score, ScoreId, TeamGoal,
    SERIES_COUNT,
};

use super::{JsonlReader, JsonlWriter, RecordKind, StorageConfig, StorageError};

/// Player list filter. Match and event filters keep players with at least
/// one score in that match / event.
#[derive(Debug, Clone, Default)]
pub struct PlayerFilter {
    pub entry_year: Option<i32>,
    pub gender: Option<Gender>,
    pub match_name: Option<String>,
    pub event_name: Option<String>,
}

impl PlayerFilter {
    /// Players passing the filter, newest entry year first.
    pub fn select(&self, players: &[Player], scores: &[Score]) -> Vec<Player> {
        let with_scores: Option<HashSet<&PlayerId>> =
            if self.match_name.is_some() || self.event_name.is_some() {
                Some(
                    scores
                        .iter()
                        .filter(|s| self.match_name.as_ref().map_or(true, |m| &s.match_name == m))
                        .filter(|s| self.event_name.as_ref().map_or(true, |e| &s.event_name == e))
                        .map(|s| &s.player_id)
                        .collect(),
                )
            } else {
                None
            };

        let mut selected: Vec<Player> = players
            .iter()
            .filter(|p| self.entry_year.map_or(true, |y| p.entry_year == Some(y)))
            .filter(|p| self.gender.map_or(true, |g| p.gender == Some(g)))
            .filter(|p| with_scores.as_ref().map_or(true, |ids| ids.contains(&p.id)))
            .cloned()
            .collect();

        selected.sort_by(player_order);
        selected
    }
}

/// Score list filter.
#[derive(Debug, Clone, Default)]
pub struct ScoreFilter {
    pub player_id: Option<PlayerId>,
    pub match_name: Option<String>,
    pub range: DateRange,
}

impl ScoreFilter {
    pub fn for_player(player_id: PlayerId) -> Self {
        Self {
            player_id: Some(player_id),
            ..Default::default()
        }
    }

    pub fn for_match(match_name: impl Into<String>) -> Self {
        Self {
            match_name: Some(match_name.into()),
            ..Default::default()
        }
    }

    fn matches(&self, score: &Score) -> bool {
        self.player_id.as_ref().map_or(true, |id| &score.player_id == id)
            && self
                .match_name
                .as_ref()
                .map_or(true, |m| &score.match_name == m)
            && self.range.contains(score.date)
    }
}

/// Point-in-time copy of every record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub players: Vec<Player>,
    pub scores: Vec<Score>,
    pub team_goals: Vec<TeamGoal>,
}

impl Snapshot {
    /// Scores joined with their players.
    pub fn views(&self) -> Vec<ScoreView<'_>> {
        join(&self.players, &self.scores)
    }

    pub fn players_matching(&self, filter: &PlayerFilter) -> Vec<Player> {
        filter.select(&self.players, &self.scores)
    }

    /// Latest scores first.
    pub fn recent_scores(&self, limit: usize) -> Vec<Score> {
        most_recent(&self.scores, limit)
    }
}

fn most_recent(scores: &[Score], limit: usize) -> Vec<Score> {
    let mut sorted: Vec<&Score> = scores.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted.into_iter().take(limit).cloned().collect()
}

/// Storage backend for the tracker's records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Copy of all records.
    async fn snapshot(&self) -> Result<Snapshot, StorageError>;

    /// Players ordered by entry year (newest first, unset last), then name.
    async fn list_players(&self, filter: &PlayerFilter) -> Result<Vec<Player>, StorageError>;

    async fn get_player(&self, id: &PlayerId) -> Result<Option<Player>, StorageError>;

    async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, StorageError>;

    /// Insert the player unless one with the same name exists. Returns the
    /// stored player and whether it was created.
    async fn ensure_player(&self, player: Player) -> Result<(Player, bool), StorageError>;

    /// Delete a player and all of their scores. Returns the player and the
    /// number of scores removed.
    async fn delete_player(&self, id: &PlayerId)
        -> Result<Option<(Player, usize)>, StorageError>;

    /// Scores ordered by date, oldest first.
    async fn list_scores(&self, filter: &ScoreFilter) -> Result<Vec<Score>, StorageError>;

    /// The `limit` most recent scores, newest first.
    async fn recent_scores(&self, limit: usize) -> Result<Vec<Score>, StorageError>;

    async fn get_score(&self, id: &ScoreId) -> Result<Option<Score>, StorageError>;

    /// Insert scores. Fails without writing anything if any score refers to
    /// an unknown player.
    async fn insert_scores(&self, scores: Vec<NewScore>) -> Result<Vec<Score>, StorageError>;

    /// Replace a score's series; the total is recomputed as their sum.
    async fn update_score_series(
        &self,
        id: &ScoreId,
        series: [f64; SERIES_COUNT],
    ) -> Result<Option<Score>, StorageError>;

    async fn delete_score(&self, id: &ScoreId) -> Result<Option<Score>, StorageError>;

    /// The goal for (event, gender), created with `default_target` if absent.
    /// Concurrent callers never create duplicates.
    async fn get_or_create_team_goal(
        &self,
        event_name: &str,
        gender: Gender,
        default_target: f64,
    ) -> Result<TeamGoal, StorageError>;

    /// Set the target for (event, gender), creating the goal if absent.
    async fn set_team_goal(
        &self,
        event_name: &str,
        gender: Gender,
        target_score: f64,
    ) -> Result<TeamGoal, StorageError>;

    async fn list_team_goals(&self, gender: Option<Gender>) -> Result<Vec<TeamGoal>, StorageError>;
}

#[derive(Debug, Default)]
struct Tables {
    players: Vec<Player>,
    scores: Vec<Score>,
    goals: Vec<TeamGoal>,
    next_seq: u64,
}

impl Tables {
    fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    fn goal(&self, event_name: &str, gender: Gender) -> Option<&TeamGoal> {
        self.goals.iter().find(|g| g.matches(event_name, gender))
    }

    /// Materialize a score with an ID no other score has.
    fn allocate(&mut self, new: NewScore, taken: &mut HashSet<ScoreId>) -> Score {
        loop {
            let score = Score::from_new(new.clone(), self.next_seq);
            self.next_seq += 1;
            if taken.insert(score.id.clone()) {
                return score;
            }
        }
    }
}

/// JSONL-backed store. Records are held in memory and the affected file is
/// rewritten after every change. All writes go through one lock, which also
/// makes goal creation a single check-and-insert step.
pub struct JsonlStore {
    config: StorageConfig,
    tables: RwLock<Tables>,
}

impl JsonlStore {
    /// Load the store from the data directory. Missing files read as empty.
    pub fn open(config: StorageConfig) -> Result<Self, StorageError> {
        let players = dedup_players(JsonlReader::<Player>::for_kind(&config, RecordKind::Player).read_all()?);
        let scores: Vec<Score> = JsonlReader::for_kind(&config, RecordKind::Score).read_all()?;
        let goals = dedup_goals(JsonlReader::<TeamGoal>::for_kind(&config, RecordKind::TeamGoal).read_all()?);

        info!(
            "Loaded {} players, {} scores, {} team goals from {:?}",
            players.len(),
            scores.len(),
            goals.len(),
            config.records_dir()
        );

        let next_seq = scores.len() as u64;
        Ok(Self {
            config,
            tables: RwLock::new(Tables {
                players,
                scores,
                goals,
                next_seq,
            }),
        })
    }

    // Callers rewrite a modified copy and swap it in only once it is on disk.

    fn write_players(&self, players: &[Player]) -> Result<(), StorageError> {
        JsonlWriter::for_kind(&self.config, RecordKind::Player).write_all(players)?;
        Ok(())
    }

    fn write_scores(&self, scores: &[Score]) -> Result<(), StorageError> {
        JsonlWriter::for_kind(&self.config, RecordKind::Score).write_all(scores)?;
        Ok(())
    }

    fn write_goals(&self, goals: &[TeamGoal]) -> Result<(), StorageError> {
        JsonlWriter::for_kind(&self.config, RecordKind::TeamGoal).write_all(goals)?;
        Ok(())
    }
}

fn dedup_players(players: Vec<Player>) -> Vec<Player> {
    let mut seen = HashSet::new();
    players
        .into_iter()
        .filter(|p| {
            let fresh = seen.insert(p.id.clone());
            if !fresh {
                warn!("Dropping duplicate player record: {}", p.name);
            }
            fresh
        })
        .collect()
}

fn dedup_goals(goals: Vec<TeamGoal>) -> Vec<TeamGoal> {
    let mut seen = HashSet::new();
    goals
        .into_iter()
        .filter(|g| {
            let fresh = seen.insert((g.event_name.clone(), g.gender));
            if !fresh {
                warn!(
                    "Dropping duplicate team goal for {} {}",
                    g.event_name, g.gender
                );
            }
            fresh
        })
        .collect()
}

fn player_order(a: &Player, b: &Player) -> std::cmp::Ordering {
    // Newest entry year first, unset last
    match (a.entry_year, b.entry_year) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
    .then_with(|| a.name.cmp(&b.name))
}

#[async_trait]
impl RecordStore for JsonlStore {
    async fn snapshot(&self) -> Result<Snapshot, StorageError> {
        let tables = self.tables.read().await;
        Ok(Snapshot {
            players: tables.players.clone(),
            scores: tables.scores.clone(),
            team_goals: tables.goals.clone(),
        })
    }

    async fn list_players(&self, filter: &PlayerFilter) -> Result<Vec<Player>, StorageError> {
        let tables = self.tables.read().await;
        Ok(filter.select(&tables.players, &tables.scores))
    }

    async fn get_player(&self, id: &PlayerId) -> Result<Option<Player>, StorageError> {
        Ok(self.tables.read().await.player(id).cloned())
    }

    async fn find_player_by_name(&self, name: &str) -> Result<Option<Player>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.players.iter().find(|p| p.name == name).cloned())
    }

    async fn ensure_player(&self, player: Player) -> Result<(Player, bool), StorageError> {
        if player.name.trim().is_empty() {
            return Err(StorageError::Invalid("player name is empty".to_string()));
        }

        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.players.iter().find(|p| p.name == player.name) {
            return Ok((existing.clone(), false));
        }

        JsonlWriter::for_kind(&self.config, RecordKind::Player).append_batch([&player])?;
        tables.players.push(player.clone());
        debug!("Created player {}", player.name);
        Ok((player, true))
    }

    async fn delete_player(
        &self,
        id: &PlayerId,
    ) -> Result<Option<(Player, usize)>, StorageError> {
        let mut tables = self.tables.write().await;
        let Some(pos) = tables.players.iter().position(|p| &p.id == id) else {
            return Ok(None);
        };

        let mut players = tables.players.clone();
        let player = players.remove(pos);
        let scores: Vec<Score> = tables
            .scores
            .iter()
            .filter(|s| &s.player_id != id)
            .cloned()
            .collect();
        let removed = tables.scores.len() - scores.len();

        self.write_scores(&scores)?;
        if let Err(e) = self.write_players(&players) {
            // Put the scores file back so the cascade is all or nothing
            if let Err(restore) = self.write_scores(&tables.scores) {
                error!("Failed to restore scores after aborted delete: {}", restore);
            }
            return Err(e);
        }

        tables.players = players;
        tables.scores = scores;
        info!("Deleted player {} and {} scores", player.name, removed);
        Ok(Some((player, removed)))
    }

    async fn list_scores(&self, filter: &ScoreFilter) -> Result<Vec<Score>, StorageError> {
        let tables = self.tables.read().await;
        let mut scores: Vec<Score> = tables
            .scores
            .iter()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        scores.sort_by_key(|s| s.date);
        Ok(scores)
    }

    async fn recent_scores(&self, limit: usize) -> Result<Vec<Score>, StorageError> {
        Ok(most_recent(&self.tables.read().await.scores, limit))
    }

    async fn get_score(&self, id: &ScoreId) -> Result<Option<Score>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.scores.iter().find(|s| &s.id == id).cloned())
    }

    async fn insert_scores(&self, scores: Vec<NewScore>) -> Result<Vec<Score>, StorageError> {
        if scores.is_empty() {
            return Ok(Vec::new());
        }
        for new in &scores {
            check_finite(&new.series, new.reported_total).map_err(StorageError::Invalid)?;
        }

        let mut tables = self.tables.write().await;
        if let Some(orphan) = scores.iter().find(|s| tables.player(&s.player_id).is_none()) {
            return Err(StorageError::NotFound(format!("player {}", orphan.player_id)));
        }

        let mut taken: HashSet<ScoreId> = tables.scores.iter().map(|s| s.id.clone()).collect();
        let created: Vec<Score> = scores
            .into_iter()
            .map(|new| tables.allocate(new, &mut taken))
            .collect();

        JsonlWriter::for_kind(&self.config, RecordKind::Score).append_batch(&created)?;
        tables.scores.extend(created.iter().cloned());
        info!("Inserted {} scores", created.len());
        Ok(created)
    }

    async fn update_score_series(
        &self,
        id: &ScoreId,
        series: [f64; SERIES_COUNT],
    ) -> Result<Option<Score>, StorageError> {
        check_finite(&series, None).map_err(StorageError::Invalid)?;

        let mut tables = self.tables.write().await;
        let mut scores = tables.scores.clone();
        let Some(score) = scores.iter_mut().find(|s| &s.id == id) else {
            return Ok(None);
        };

        score.set_series(series);
        let updated = score.clone();
        self.write_scores(&scores)?;
        tables.scores = scores;
        debug!("Updated score {} (total {})", updated.id, updated.total);
        Ok(Some(updated))
    }

    async fn delete_score(&self, id: &ScoreId) -> Result<Option<Score>, StorageError> {
        let mut tables = self.tables.write().await;
        let Some(pos) = tables.scores.iter().position(|s| &s.id == id) else {
            return Ok(None);
        };

        let mut scores = tables.scores.clone();
        let removed = scores.remove(pos);
        self.write_scores(&scores)?;
        tables.scores = scores;
        debug!("Deleted score {}", removed.id);
        Ok(Some(removed))
    }

    async fn get_or_create_team_goal(
        &self,
        event_name: &str,
        gender: Gender,
        default_target: f64,
    ) -> Result<TeamGoal, StorageError> {
        if let Some(goal) = self.tables.read().await.goal(event_name, gender) {
            return Ok(goal.clone());
        }

        // Re-check under the write lock: another caller may have created it
        let mut tables = self.tables.write().await;
        if let Some(goal) = tables.goal(event_name, gender) {
            return Ok(goal.clone());
        }

        let goal = TeamGoal::new(event_name, gender, default_target);
        JsonlWriter::for_kind(&self.config, RecordKind::TeamGoal).append_batch([&goal])?;
        tables.goals.push(goal.clone());
        info!(
            "Created default team goal {} {} = {}",
            event_name, gender, default_target
        );
        Ok(goal)
    }

    async fn set_team_goal(
        &self,
        event_name: &str,
        gender: Gender,
        target_score: f64,
    ) -> Result<TeamGoal, StorageError> {
        if !target_score.is_finite() {
            return Err(StorageError::Invalid(format!(
                "target score must be a number, got {}",
                target_score
            )));
        }

        let mut tables = self.tables.write().await;
        let mut goals = tables.goals.clone();
        let goal = match goals.iter_mut().find(|g| g.matches(event_name, gender)) {
            Some(goal) => {
                goal.target_score = target_score;
                goal.clone()
            }
            None => {
                let goal = TeamGoal::new(event_name, gender, target_score);
                goals.push(goal.clone());
                goal
            }
        };

        self.write_goals(&goals)?;
        tables.goals = goals;
        info!("Set team goal {} {} = {}", event_name, gender, target_score);
        Ok(goal)
    }

    async fn list_team_goals(&self, gender: Option<Gender>) -> Result<Vec<TeamGoal>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .goals
            .iter()
            .filter(|g| gender.map_or(true, |x| g.gender == x))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn open(temp_dir: &TempDir) -> JsonlStore {
        JsonlStore::open(StorageConfig::new(temp_dir.path().to_path_buf())).unwrap()
    }

    fn new_score(player: &Player, date: NaiveDate, match_name: &str, event: &str) -> NewScore {
        NewScore {
            player_id: player.id.clone(),
            date,
            match_name: match_name.to_string(),
            category: Category::Regular,
            event_name: event.to_string(),
            series: [100.0; SERIES_COUNT],
            reported_total: None,
        }
    }

    #[tokio::test]
    async fn test_ensure_player_is_idempotent_by_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        let (a, created) = store
            .ensure_player(Player::new("A".into(), Some(Gender::Male), Some(2023)))
            .await
            .unwrap();
        assert!(created);

        let (again, created) = store
            .ensure_player(Player::new("A".into(), Some(Gender::Female), None))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again, a);
    }

    #[tokio::test]
    async fn test_empty_player_name_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let result = store.ensure_player(Player::new(" ".into(), None, None)).await;
        assert!(matches!(result, Err(StorageError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_list_players_order_and_filters() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        let old = Player::new("Old".into(), Some(Gender::Male), Some(2021));
        let new_b = Player::new("B".into(), Some(Gender::Female), Some(2024));
        let new_a = Player::new("A".into(), Some(Gender::Male), Some(2024));
        let unset = Player::new("Unset".into(), Some(Gender::Male), None);
        for p in [&old, &new_b, &new_a, &unset] {
            store.ensure_player(p.clone()).await.unwrap();
        }
        store
            .insert_scores(vec![new_score(&old, d(2024, 5, 1), "新人戦", "AR60")])
            .await
            .unwrap();

        let all = store.list_players(&PlayerFilter::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "Old", "Unset"]);

        let male_2024 = store
            .list_players(&PlayerFilter {
                entry_year: Some(2024),
                gender: Some(Gender::Male),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(male_2024.len(), 1);
        assert_eq!(male_2024[0].name, "A");

        let in_match = store
            .list_players(&PlayerFilter {
                match_name: Some("新人戦".into()),
                event_name: Some("AR60".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(in_match.len(), 1);
        assert_eq!(in_match[0].name, "Old");
    }

    #[tokio::test]
    async fn test_insert_scores_rejects_unknown_player() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let ghost = Player::new("Ghost".into(), None, None);

        let result = store
            .insert_scores(vec![new_score(&ghost, d(2024, 5, 1), "m", "AR60")])
            .await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
        assert!(store.snapshot().await.unwrap().scores.is_empty());
    }

    #[tokio::test]
    async fn test_identical_scores_get_distinct_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let (p, _) = store
            .ensure_player(Player::new("A".into(), Some(Gender::Male), None))
            .await
            .unwrap();

        let s = new_score(&p, d(2024, 5, 1), "m", "AR60");
        let created = store.insert_scores(vec![s.clone(), s]).await.unwrap();
        assert_ne!(created[0].id, created[1].id);
    }

    #[tokio::test]
    async fn test_records_persist_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = open(&temp_dir);
            let (p, _) = store
                .ensure_player(Player::new("A".into(), Some(Gender::Male), Some(2022)))
                .await
                .unwrap();
            store
                .insert_scores(vec![new_score(&p, d(2024, 5, 1), "m", "AR60")])
                .await
                .unwrap();
            store
                .get_or_create_team_goal("AR60", Gender::Male, 620.0)
                .await
                .unwrap();
        }

        let reopened = open(&temp_dir);
        let snapshot = reopened.snapshot().await.unwrap();
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.scores.len(), 1);
        assert_eq!(snapshot.team_goals.len(), 1);
        assert_eq!(snapshot.views().len(), 1);
    }

    #[tokio::test]
    async fn test_update_series_recomputes_total() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let (p, _) = store
            .ensure_player(Player::new("A".into(), Some(Gender::Male), None))
            .await
            .unwrap();
        let mut s = new_score(&p, d(2024, 5, 1), "m", "AR60");
        s.reported_total = Some(612.0);
        let created = store.insert_scores(vec![s]).await.unwrap();
        assert_eq!(created[0].total, 612.0);

        let updated = store
            .update_score_series(&created[0].id, [101.0, 102.0, 103.0, 104.0, 105.0, 106.0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.total, 621.0);
        assert_eq!(
            store.get_score(&created[0].id).await.unwrap().unwrap().total,
            621.0
        );

        let missing = store
            .update_score_series(&ScoreId::from("nope"), [0.0; SERIES_COUNT])
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_player_cascades() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let (a, _) = store
            .ensure_player(Player::new("A".into(), Some(Gender::Male), None))
            .await
            .unwrap();
        let (b, _) = store
            .ensure_player(Player::new("B".into(), Some(Gender::Male), None))
            .await
            .unwrap();
        store
            .insert_scores(vec![
                new_score(&a, d(2024, 5, 1), "m", "AR60"),
                new_score(&a, d(2024, 6, 1), "m", "AR60"),
                new_score(&b, d(2024, 6, 1), "m", "AR60"),
            ])
            .await
            .unwrap();

        let (deleted, removed) = store.delete_player(&a.id).await.unwrap().unwrap();
        assert_eq!(deleted.name, "A");
        assert_eq!(removed, 2);

        let reopened = open(&temp_dir);
        let snapshot = reopened.snapshot().await.unwrap();
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.scores.len(), 1);
        assert!(store.delete_player(&a.id).await.unwrap().is_none());
    }

    /// Make the next whole-file rewrite of `kind` fail by occupying its temp path.
    fn block_rewrite(temp_dir: &TempDir, kind: RecordKind) {
        let config = StorageConfig::new(temp_dir.path().to_path_buf());
        std::fs::create_dir_all(config.record_path(kind).with_extension("jsonl.tmp")).unwrap();
    }

    async fn store_with_scores(temp_dir: &TempDir) -> (JsonlStore, Player, Vec<Score>) {
        let store = open(temp_dir);
        let (p, _) = store
            .ensure_player(Player::new("A".into(), Some(Gender::Male), None))
            .await
            .unwrap();
        let created = store
            .insert_scores(vec![
                new_score(&p, d(2024, 5, 1), "m", "AR60"),
                new_score(&p, d(2024, 6, 1), "m", "AR60"),
            ])
            .await
            .unwrap();
        (store, p, created)
    }

    #[tokio::test]
    async fn test_failed_update_leaves_memory_unchanged() {
        let temp_dir = TempDir::new().unwrap();
        let (store, _, created) = store_with_scores(&temp_dir).await;
        block_rewrite(&temp_dir, RecordKind::Score);

        let result = store.update_score_series(&created[0].id, [0.0; SERIES_COUNT]).await;
        assert!(result.is_err());
        assert_eq!(store.get_score(&created[0].id).await.unwrap().unwrap().total, 600.0);

        assert!(store.delete_score(&created[0].id).await.is_err());
        assert!(store.get_score(&created[0].id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_failed_player_delete_keeps_player_and_scores() {
        let temp_dir = TempDir::new().unwrap();
        let (store, p, _) = store_with_scores(&temp_dir).await;
        block_rewrite(&temp_dir, RecordKind::Player);

        assert!(store.delete_player(&p.id).await.is_err());

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.scores.len(), 2);

        let reopened = open(&temp_dir).snapshot().await.unwrap();
        assert_eq!(reopened.players.len(), 1);
        assert_eq!(reopened.scores.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_goal_update_keeps_old_target() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        store.get_or_create_team_goal("AR60", Gender::Male, 620.0).await.unwrap();
        block_rewrite(&temp_dir, RecordKind::TeamGoal);

        assert!(store.set_team_goal("AR60", Gender::Male, 630.0).await.is_err());
        assert!(store.set_team_goal("P60", Gender::Male, 560.0).await.is_err());

        let goals = store.list_team_goals(None).await.unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].target_score, 620.0);
    }

    #[tokio::test]
    async fn test_non_finite_series_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let (store, p, created) = store_with_scores(&temp_dir).await;

        let mut bad = new_score(&p, d(2024, 7, 1), "m", "AR60");
        bad.series[0] = f64::NAN;
        let err = store.insert_scores(vec![bad]).await.unwrap_err();
        assert!(matches!(err, StorageError::Invalid(_)));

        let mut bad_total = new_score(&p, d(2024, 7, 1), "m", "AR60");
        bad_total.reported_total = Some(f64::INFINITY);
        assert!(store.insert_scores(vec![bad_total]).await.is_err());

        let mut series = [100.0; SERIES_COUNT];
        series[5] = f64::INFINITY;
        let err = store.update_score_series(&created[0].id, series).await.unwrap_err();
        assert!(matches!(err, StorageError::Invalid(_)));

        assert_eq!(store.snapshot().await.unwrap().scores.len(), 2);
        assert_eq!(open(&temp_dir).snapshot().await.unwrap().scores.len(), 2);
    }

    #[tokio::test]
    async fn test_list_and_recent_scores_order() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let (p, _) = store
            .ensure_player(Player::new("A".into(), Some(Gender::Male), None))
            .await
            .unwrap();
        store
            .insert_scores(vec![
                new_score(&p, d(2024, 7, 1), "Autumn", "AR60"),
                new_score(&p, d(2024, 5, 1), "Spring", "AR60"),
                new_score(&p, d(2024, 6, 1), "Spring", "AR60"),
            ])
            .await
            .unwrap();

        let spring = store
            .list_scores(&ScoreFilter::for_match("Spring"))
            .await
            .unwrap();
        assert_eq!(spring.len(), 2);
        assert!(spring[0].date < spring[1].date);

        let recent = store.recent_scores(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].date, d(2024, 7, 1));

        let windowed = store
            .list_scores(&ScoreFilter {
                player_id: Some(p.id.clone()),
                range: DateRange::since(d(2024, 6, 1)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(windowed.len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_goal_creation_yields_single_row() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(open(&temp_dir));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .get_or_create_team_goal("AR60", Gender::Female, 620.0)
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().target_score, 620.0);
        }

        assert_eq!(store.list_team_goals(None).await.unwrap().len(), 1);
        let reopened = open(&temp_dir);
        assert_eq!(reopened.list_team_goals(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_existing_goal_keeps_its_target() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        store.set_team_goal("P60", Gender::Male, 575.0).await.unwrap();
        let goal = store
            .get_or_create_team_goal("P60", Gender::Male, 560.0)
            .await
            .unwrap();
        assert_eq!(goal.target_score, 575.0);

        let female = store.list_team_goals(Some(Gender::Female)).await.unwrap();
        assert!(female.is_empty());
    }

    #[tokio::test]
    async fn test_set_goal_rejects_non_finite() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let result = store.set_team_goal("P60", Gender::Male, f64::NAN).await;
        assert!(matches!(result, Err(StorageError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_duplicate_goal_rows_are_collapsed_on_load() {
        let temp_dir = TempDir::new().unwrap();
        let config = StorageConfig::new(temp_dir.path().to_path_buf());
        JsonlWriter::for_kind(&config, RecordKind::TeamGoal)
            .write_all(&[
                TeamGoal::new("AR60", Gender::Male, 620.0),
                TeamGoal::new("AR60", Gender::Male, 600.0),
            ])
            .unwrap();

        let store = JsonlStore::open(config).unwrap();
        let goals = store.list_team_goals(None).await.unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].target_score, 620.0);
    }
}
