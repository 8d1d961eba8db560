//! Content-derived record IDs.
//!
//! Players are keyed by name and scores by their identifying fields plus an
//! insertion sequence, so re-importing the same file on a fresh data
//! directory reproduces the same IDs.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Hex characters kept from the digest.
const ID_LEN: usize = 16;

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Hash `fields` joined with `|` and keep the first 16 hex characters.
    pub fn generate(fields: &[&str]) -> Self {
        let digest = Sha256::digest(fields.join("|").as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(ID_LEN);
        Self(hex)
    }

    pub fn player(name: &str) -> PlayerId {
        Self::generate(&["player", name])
    }

    pub fn score(
        player_id: &PlayerId,
        date: NaiveDate,
        match_name: &str,
        event_name: &str,
        seq: u64,
    ) -> ScoreId {
        Self::generate(&[
            player_id.as_str(),
            &date.to_string(),
            match_name,
            event_name,
            &seq.to_string(),
        ])
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl FromStr for EntityId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty id".to_string());
        }
        Ok(Self(s.to_string()))
    }
}

/// Derived from the (unique) player name.
pub type PlayerId = EntityId;

/// Derived from the score's fields plus an insertion sequence.
pub type ScoreId = EntityId;
