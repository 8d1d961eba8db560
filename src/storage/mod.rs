//! Filesystem record store.
//!
//! Players, scores and team goals live as JSONL files under the data
//! directory:
//! - `records/players.jsonl`
//! - `records/scores.jsonl`
//! - `records/team_goals.jsonl`

mod jsonl;
mod store;

pub use jsonl::*;
pub use store::*;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    Invalid(String),
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join("records")
    }

    pub fn record_path(&self, kind: RecordKind) -> PathBuf {
        self.records_dir().join(kind.filename())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// Record types held by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Player,
    Score,
    TeamGoal,
}

impl RecordKind {
    /// Get the filename for this record type.
    pub fn filename(&self) -> &'static str {
        match self {
            RecordKind::Player => "players.jsonl",
            RecordKind::Score => "scores.jsonl",
            RecordKind::TeamGoal => "team_goals.jsonl",
        }
    }
}
