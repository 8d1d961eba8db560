//! Configuration loading and validation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::calculate::SeasonCalendar;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// First day of the season.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonConfig {
    #[serde(default = "default_start_month")]
    pub start_month: u32,

    #[serde(default = "default_start_day")]
    pub start_day: u32,
}

fn default_start_month() -> u32 {
    4
}

fn default_start_day() -> u32 {
    1
}

impl Default for SeasonConfig {
    fn default() -> Self {
        Self {
            start_month: default_start_month(),
            start_day: default_start_day(),
        }
    }
}

/// Dashboard chart window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Trailing window ending at the latest score
    #[serde(default = "default_window_years")]
    pub window_years: u32,

    /// Window start when there are no scores at all
    #[serde(default = "default_fallback_start")]
    pub fallback_start: NaiveDate,
}

fn default_window_years() -> u32 {
    4
}

fn default_fallback_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN)
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            window_years: default_window_years(),
            fallback_start: default_fallback_start(),
        }
    }
}

/// Event lists and goal defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Events with dashboard stats, charts, goals and rankings
    #[serde(default = "default_dashboard_events")]
    pub dashboard: Vec<String>,

    /// Display order; unlisted events sort after these, by name
    #[serde(default = "default_display_order")]
    pub display_order: Vec<String>,

    /// Target used when a team goal is first created
    #[serde(default = "default_goals")]
    pub default_goals: BTreeMap<String, f64>,

    #[serde(default = "default_fallback_goal")]
    pub fallback_goal: f64,
}

fn default_dashboard_events() -> Vec<String> {
    vec!["AR60".into(), "SB3x20".into(), "P60".into()]
}

fn default_display_order() -> Vec<String> {
    vec![
        "AR60".into(),
        "SB3x20".into(),
        "P60".into(),
        "AP60".into(),
        "BP".into(),
    ]
}

fn default_goals() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("AR60".to_string(), 620.0),
        ("SB3x20".to_string(), 570.0),
        ("P60".to_string(), 560.0),
    ])
}

fn default_fallback_goal() -> f64 {
    600.0
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            dashboard: default_dashboard_events(),
            display_order: default_display_order(),
            default_goals: default_goals(),
            fallback_goal: default_fallback_goal(),
        }
    }
}

/// Competition naming rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// A competition whose name contains any of these is mixed-gender
    #[serde(default = "default_mixed_patterns")]
    pub mixed_gender_patterns: Vec<String>,

    /// Competitions are listed by the first keyword their name contains
    #[serde(default = "default_order_keywords")]
    pub order_keywords: Vec<String>,

    /// Events with team totals in separate-gender competitions
    #[serde(default = "default_team_events")]
    pub team_events: Vec<String>,

    /// Events with team totals in mixed-gender competitions
    #[serde(default = "default_mixed_team_events")]
    pub mixed_team_events: Vec<String>,
}

fn default_mixed_patterns() -> Vec<String> {
    vec!["早慶戦".into()]
}

fn default_order_keywords() -> Vec<String> {
    [
        "春季関東大会",
        "選抜",
        "東京六大学（春）",
        "新人BR大会",
        "東日本学生",
        "秋季関東大会",
        "東京六大学（秋）",
        "東西六大学",
        "全日本",
        "新人戦",
        "早慶戦",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_team_events() -> Vec<String> {
    vec!["AR60".into(), "SB3x20".into()]
}

fn default_mixed_team_events() -> Vec<String> {
    vec!["AR60".into(), "SB3x20".into(), "P60".into()]
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            mixed_gender_patterns: default_mixed_patterns(),
            order_keywords: default_order_keywords(),
            team_events: default_team_events(),
            mixed_team_events: default_mixed_team_events(),
        }
    }
}

/// What to do with an import row whose date does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BadDatePolicy {
    /// Record the score under the import day
    #[default]
    Today,
    /// Reject the row
    Skip,
}

/// Import and listing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default)]
    pub bad_date_policy: BadDatePolicy,

    /// Number of scores in the dashboard's recent list
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

fn default_recent_limit() -> usize {
    10
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            bad_date_policy: BadDatePolicy::default(),
            recent_limit: default_recent_limit(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub season: SeasonConfig,

    #[serde(default)]
    pub charts: ChartConfig,

    #[serde(default)]
    pub events: EventConfig,

    #[serde(default)]
    pub matches: MatchConfig,

    #[serde(default)]
    pub import: ImportConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            server: ServerConfig::default(),
            season: SeasonConfig::default(),
            charts: ChartConfig::default(),
            events: EventConfig::default(),
            matches: MatchConfig::default(),
            import: ImportConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or use the defaults if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            info!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if SeasonCalendar::new(self.season.start_month, self.season.start_day).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "Season start {}/{} is not a valid date in every year",
                self.season.start_month, self.season.start_day
            )));
        }

        if self.charts.window_years == 0 {
            return Err(ConfigError::ValidationError(
                "Chart window must be at least one year".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn calendar(&self) -> SeasonCalendar {
        SeasonCalendar::new(self.season.start_month, self.season.start_day).unwrap_or_default()
    }

    pub fn is_mixed_gender(&self, match_name: &str) -> bool {
        self.matches
            .mixed_gender_patterns
            .iter()
            .any(|p| match_name.contains(p.as_str()))
    }

    /// Target for a team goal that does not exist yet.
    pub fn default_goal(&self, event_name: &str) -> f64 {
        self.events
            .default_goals
            .get(event_name)
            .copied()
            .unwrap_or(self.events.fallback_goal)
    }

    /// Events with team totals for the given competition.
    pub fn team_events_for(&self, match_name: &str) -> &[String] {
        if self.is_mixed_gender(match_name) {
            &self.matches.mixed_team_events
        } else {
            &self.matches.team_events
        }
    }

    /// Sort competition names by the first keyword they contain. Names with
    /// no keyword go last; the sort is stable otherwise.
    pub fn order_match_names(&self, names: &mut [String]) {
        let keywords = &self.matches.order_keywords;
        names.sort_by_key(|name| {
            keywords
                .iter()
                .position(|k| name.contains(k.as_str()))
                .unwrap_or(usize::MAX)
        });
    }

    /// Sort event names by display order, then alphabetically.
    pub fn sort_events(&self, events: &mut [String]) {
        let order = &self.events.display_order;
        events.sort_by(|a, b| {
            let rank = |e: &String| order.iter().position(|o| o == e).unwrap_or(usize::MAX);
            rank(a).cmp(&rank(b)).then_with(|| a.cmp(b))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.calendar(), SeasonCalendar::default());
        assert_eq!(config.charts.window_years, 4);
        assert_eq!(config.import.bad_date_policy, BadDatePolicy::Today);
        assert_eq!(config.import.recent_limit, 10);
    }

    #[test]
    fn test_default_goals() {
        let config = AppConfig::default();
        assert_eq!(config.default_goal("AR60"), 620.0);
        assert_eq!(config.default_goal("SB3x20"), 570.0);
        assert_eq!(config.default_goal("P60"), 560.0);
        assert_eq!(config.default_goal("BP"), 600.0);
    }

    #[test]
    fn test_config_validation_ok() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_season_start() {
        let mut config = AppConfig::default();
        config.season.start_month = 2;
        config.season.start_day = 29;
        assert!(config.validate().is_err());

        config.season.start_month = 13;
        config.season.start_day = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_window() {
        let mut config = AppConfig::default();
        config.charts.window_years = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            data_dir = "/srv/scores"

            [season]
            start_month = 9

            [import]
            bad_date_policy = "skip"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/scores"));
        assert_eq!(config.season.start_month, 9);
        assert_eq!(config.season.start_day, 1);
        assert_eq!(config.import.bad_date_policy, BadDatePolicy::Skip);
        assert_eq!(config.events.dashboard, vec!["AR60", "SB3x20", "P60"]);
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.data_dir, parsed.data_dir);
        assert_eq!(config.events.default_goals, parsed.events.default_goals);
        assert_eq!(config.charts.fallback_start, parsed.charts.fallback_start);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load_or_default(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_from_file_rejects_invalid() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[charts]\nwindow_years = 0\n").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_mixed_gender_and_team_events() {
        let config = AppConfig::default();
        assert!(config.is_mixed_gender("第70回早慶戦"));
        assert!(!config.is_mixed_gender("新人戦"));
        assert_eq!(config.team_events_for("早慶戦").len(), 3);
        assert_eq!(config.team_events_for("新人戦"), &["AR60", "SB3x20"]);
    }

    #[test]
    fn test_order_match_names() {
        let config = AppConfig::default();
        let mut names = vec![
            "練習試合".to_string(),
            "第70回早慶戦".to_string(),
            "2024 春季関東大会".to_string(),
            "全日本学生".to_string(),
        ];
        config.order_match_names(&mut names);
        assert_eq!(
            names,
            vec!["2024 春季関東大会", "全日本学生", "第70回早慶戦", "練習試合"]
        );
    }

    #[test]
    fn test_sort_events() {
        let config = AppConfig::default();
        let mut events = vec![
            "Z".to_string(),
            "BP".to_string(),
            "AR60".to_string(),
            "A".to_string(),
            "P60".to_string(),
        ];
        config.sort_events(&mut events);
        assert_eq!(events, vec!["AR60", "P60", "BP", "A", "Z"]);
    }
}
