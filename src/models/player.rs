//! Team member model.

use serde::{Deserialize, Serialize};

use super::{EntityId, PlayerId};

/// Competitive gender division.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// Normalize free-text gender input.
    ///
    /// Accepts the Japanese labels used by the team's spreadsheets (男 / 女)
    /// as well as English spellings. Anything else is unrecognized.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "男" | "男子" | "male" | "m" | "men" => Some(Gender::Male),
            "女" | "女子" | "female" | "f" | "women" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gender::parse(s).ok_or_else(|| format!("unrecognized gender: {}", s))
    }
}

/// A team member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Unique identifier (derived from name)
    pub id: PlayerId,

    /// Display name, unique across the team
    pub name: String,

    /// Division. `None` when the source value was not recognized; such
    /// players are left out of every gender-keyed statistic.
    pub gender: Option<Gender>,

    /// Year the player joined the team
    pub entry_year: Option<i32>,
}

impl Player {
    /// Create a new Player with an ID derived from its name.
    pub fn new(name: String, gender: Option<Gender>, entry_year: Option<i32>) -> Self {
        let id = Self::id_for(&name);
        Self {
            id,
            name,
            gender,
            entry_year,
        }
    }

    /// The ID a player with this name has (or would have).
    pub fn id_for(name: &str) -> PlayerId {
        EntityId::player(name)
    }
}

/// Strip ASCII and full-width spaces so names typed with or without a
/// separator match each other.
pub fn normalize_name(name: &str) -> String {
    name.chars().filter(|c| *c != ' ' && *c != '\u{3000}').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_parse_japanese_and_english() {
        assert_eq!(Gender::parse("男"), Some(Gender::Male));
        assert_eq!(Gender::parse("女"), Some(Gender::Female));
        assert_eq!(Gender::parse(" Female "), Some(Gender::Female));
        assert_eq!(Gender::parse("M"), Some(Gender::Male));
        assert_eq!(Gender::parse(""), None);
        assert_eq!(Gender::parse("mixed"), None);
    }

    #[test]
    fn test_gender_from_str_error() {
        assert!("x".parse::<Gender>().is_err());
        assert_eq!("male".parse::<Gender>().unwrap(), Gender::Male);
    }

    #[test]
    fn test_gender_serialization() {
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"female\"");
    }

    #[test]
    fn test_player_id_from_name() {
        let p = Player::new("山田 太郎".to_string(), Some(Gender::Male), Some(2023));
        assert_eq!(p.id, Player::id_for("山田 太郎"));
        assert_ne!(p.id, Player::id_for("山田太郎"));
    }

    #[test]
    fn test_normalize_name_strips_both_space_kinds() {
        assert_eq!(normalize_name("山田 太郎"), "山田太郎");
        assert_eq!(normalize_name("山田\u{3000}太郎"), "山田太郎");
        assert_eq!(normalize_name(" a b "), "ab");
    }
}
