//! Bulk score import from CSV.
//!
//! The team's spreadsheets export with Japanese headers (選手名, 性別, 入部年度,
//! 日付, S1..S6, 合計点 or 合計, 大会名, 識別, 種目). English headers are
//! accepted as aliases. Rows are applied independently: a bad row is
//! reported and skipped, the rest of the file still imports.

use std::io::Read;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::BadDatePolicy;
use crate::models::{check_finite, Category, Gender, NewScore, Player, SERIES_COUNT};
use crate::storage::{RecordStore, StorageError};

/// Import errors that abort the whole file.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A row that could not be imported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    /// 1-based line number in the file, header included
    pub line: u64,
    pub message: String,
}

/// Outcome of an import.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub players_created: usize,
    pub scores_created: usize,
    pub errors: Vec<RowError>,
}

#[derive(Debug, Deserialize)]
struct ScoreRow {
    #[serde(rename = "選手名", alias = "name", alias = "player")]
    name: Option<String>,

    #[serde(rename = "性別", alias = "gender", default)]
    gender: Option<String>,

    #[serde(rename = "入部年度", alias = "entry_year", default)]
    entry_year: Option<String>,

    #[serde(rename = "日付", alias = "date", default)]
    date: Option<String>,

    #[serde(rename = "S1", alias = "s1", default)]
    s1: Option<f64>,
    #[serde(rename = "S2", alias = "s2", default)]
    s2: Option<f64>,
    #[serde(rename = "S3", alias = "s3", default)]
    s3: Option<f64>,
    #[serde(rename = "S4", alias = "s4", default)]
    s4: Option<f64>,
    #[serde(rename = "S5", alias = "s5", default)]
    s5: Option<f64>,
    #[serde(rename = "S6", alias = "s6", default)]
    s6: Option<f64>,

    #[serde(rename = "合計点", alias = "total", default)]
    total: Option<f64>,

    #[serde(rename = "合計", default)]
    total_short: Option<f64>,

    #[serde(rename = "大会名", alias = "match", alias = "match_name", default)]
    match_name: Option<String>,

    #[serde(rename = "識別", alias = "category", default)]
    category: Option<String>,

    #[serde(rename = "種目", alias = "event", alias = "event_name", default)]
    event_name: Option<String>,
}

impl ScoreRow {
    fn series(&self) -> [f64; SERIES_COUNT] {
        [self.s1, self.s2, self.s3, self.s4, self.s5, self.s6].map(|s| s.unwrap_or(0.0))
    }

    /// `合計` is only consulted when `合計点` is missing. A zero total falls
    /// back to the series sum.
    fn reported_total(&self) -> Option<f64> {
        self.total.or(self.total_short)
    }
}

/// Parse `YYYY/MM/DD` or `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

/// Entry years sometimes arrive as "2023.0" from spreadsheet exports.
fn parse_entry_year(s: &str) -> Option<i32> {
    let s = s.trim();
    s.parse::<i32>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().filter(|y| y.fract() == 0.0).map(|y| y as i32))
}

fn text(field: &Option<String>) -> String {
    field.as_deref().map(str::trim).unwrap_or_default().to_string()
}

/// Import options.
#[derive(Debug, Clone, Copy)]
pub struct ImportOptions {
    pub bad_date_policy: BadDatePolicy,
    /// Date used for rows with an unparseable date under `BadDatePolicy::Today`
    pub today: NaiveDate,
}

/// Import score rows from CSV. Unknown players are created; all scores
/// are inserted in one batch at the end.
pub async fn import_csv<R: Read>(
    store: &dyn RecordStore,
    reader: R,
    options: ImportOptions,
) -> Result<ImportReport, ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut report = ImportReport::default();
    let mut new_scores = Vec::new();

    for (i, result) in rdr.deserialize::<ScoreRow>().enumerate() {
        let line = i as u64 + 2;
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping line {}: {}", line, e);
                report.errors.push(RowError {
                    line,
                    message: e.to_string(),
                });
                continue;
            }
        };

        match convert_row(store, &row, line, options, &mut report).await? {
            Ok(score) => new_scores.push(score),
            Err(message) => {
                warn!("Skipping line {}: {}", line, message);
                report.errors.push(RowError { line, message });
            }
        }
    }

    let created = store.insert_scores(new_scores).await?;
    report.scores_created = created.len();

    info!(
        "Import finished: {} players created, {} scores created, {} rows skipped",
        report.players_created,
        report.scores_created,
        report.errors.len()
    );
    Ok(report)
}

/// Resolve one row into a score. The outer error aborts the import, the
/// inner one rejects only this row.
async fn convert_row(
    store: &dyn RecordStore,
    row: &ScoreRow,
    line: u64,
    options: ImportOptions,
    report: &mut ImportReport,
) -> Result<Result<NewScore, String>, ImportError> {
    let name = text(&row.name);
    if name.is_empty() {
        return Ok(Err("player name is empty".to_string()));
    }

    let series = row.series();
    let reported_total = row.reported_total();
    if let Err(message) = check_finite(&series, reported_total) {
        return Ok(Err(message));
    }

    let date = match row.date.as_deref().and_then(parse_date) {
        Some(date) => date,
        None => match options.bad_date_policy {
            BadDatePolicy::Today => {
                warn!(
                    "Line {}: unreadable date {:?}, using {}",
                    line, row.date, options.today
                );
                options.today
            }
            BadDatePolicy::Skip => {
                return Ok(Err(format!("unreadable date {:?}", row.date)));
            }
        },
    };

    let player = match store.find_player_by_name(&name).await? {
        Some(player) => player,
        None => {
            let raw_gender = text(&row.gender);
            let gender = Gender::parse(&raw_gender);
            if gender.is_none() {
                warn!(
                    "Line {}: unrecognized gender {:?} for {}, left unspecified",
                    line, raw_gender, name
                );
            }
            let entry_year = row.entry_year.as_deref().and_then(parse_entry_year);

            let (player, created) = store
                .ensure_player(Player::new(name, gender, entry_year))
                .await?;
            if created {
                report.players_created += 1;
            }
            player
        }
    };

    let score = NewScore {
        player_id: player.id,
        date,
        match_name: text(&row.match_name),
        category: Category::from(text(&row.category)),
        event_name: text(&row.event_name),
        series,
        reported_total,
    };
    debug!("Line {}: {} {} on {}", line, player.name, score.event_name, date);
    Ok(Ok(score))
}
