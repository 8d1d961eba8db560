use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shooting_tracker::api::state::AppState;
use shooting_tracker::config::AppConfig;
use shooting_tracker::ingest::{self, ImportOptions};
use shooting_tracker::models::{Gender, ScoreId, SERIES_COUNT};
use shooting_tracker::reports::{self, DashboardQuery};
use shooting_tracker::storage::{JsonlStore, RecordStore, StorageConfig};

#[derive(Parser)]
#[command(name = "shooting-tracker")]
#[command(about = "Score tracking, statistics and rankings for a shooting team")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Import scores from a CSV export
    Import {
        /// CSV file (UTF-8)
        file: PathBuf,
    },

    /// Team overview: goals, stats, charts, players and recent scores
    Dashboard {
        /// Name substring; spaces are ignored
        #[arg(long)]
        name: Option<String>,

        /// Entry year
        #[arg(long)]
        year: Option<i32>,

        #[arg(long)]
        gender: Option<Gender>,

        /// Only players with scores in this competition
        #[arg(long = "match")]
        match_name: Option<String>,

        /// Only players with scores in this event
        #[arg(long)]
        event: Option<String>,
    },

    /// Player profile with ranks and progress chart
    Player { name: String },

    /// Current-season and all-time rankings
    Ranking,

    /// List competitions
    Matches,

    /// Season rosters and team totals of a competition
    MatchHistory { name: String },

    /// Results of a competition in one season
    MatchResult {
        name: String,
        /// First year of the season
        year: i32,
    },

    /// Set a team goal
    SetGoal {
        event: String,
        gender: Gender,
        target: f64,
    },

    /// Replace the six series of a score; the total is recomputed
    EditScore {
        id: ScoreId,
        #[arg(num_args = SERIES_COUNT, required = true)]
        series: Vec<f64>,
    },

    /// Delete a score
    DeleteScore { id: ScoreId },

    /// Delete a player and all of their scores
    DeletePlayer { name: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {:?}", cli.config))?;
    if let Some(data_dir) = cli.data_dir.clone() {
        config.data_dir = data_dir;
    }

    // Initialize tracing
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));

    // Logs go to stderr; stdout carries the JSON reports
    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!("Starting shooting-tracker v{}", env!("CARGO_PKG_VERSION"));

    let store = JsonlStore::open(StorageConfig::new(config.data_dir.clone()))?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let state = AppState::new(Arc::new(store), config);
            let app = shooting_tracker::api::build_router(state);

            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("API listening on http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Import { file } => {
            let reader = std::fs::File::open(&file).with_context(|| format!("opening {:?}", file))?;
            let options = ImportOptions {
                bad_date_policy: config.import.bad_date_policy,
                today: Local::now().date_naive(),
            };
            let report = ingest::import_csv(&store, std::io::BufReader::new(reader), options).await?;
            print_json(&report)?;
        }
        Commands::Dashboard {
            name,
            year,
            gender,
            match_name,
            event,
        } => {
            let query = DashboardQuery {
                name,
                year,
                gender,
                match_name,
                event_name: event,
            };
            print_json(&reports::dashboard(&store, &config, &query).await?)?;
        }
        Commands::Player { name } => {
            let player = store
                .find_player_by_name(&name)
                .await?
                .ok_or_else(|| anyhow!("no player named {}", name))?;
            let report = reports::player_report(&store, &config, &player.id)
                .await?
                .ok_or_else(|| anyhow!("player {} disappeared", name))?;
            print_json(&report)?;
        }
        Commands::Ranking => {
            let today = Local::now().date_naive();
            print_json(&reports::ranking(&store, &config, today).await?)?;
        }
        Commands::Matches => {
            print_json(&reports::match_names(&store, &config).await?)?;
        }
        Commands::MatchHistory { name } => {
            let history = reports::match_history(&store, &config, &name)
                .await?
                .ok_or_else(|| anyhow!("no scores for competition {}", name))?;
            print_json(&history)?;
        }
        Commands::MatchResult { name, year } => {
            print_json(&reports::match_result(&store, &config, &name, year).await?)?;
        }
        Commands::SetGoal {
            event,
            gender,
            target,
        } => {
            print_json(&store.set_team_goal(&event, gender, target).await?)?;
        }
        Commands::EditScore { id, series } => {
            let series: [f64; SERIES_COUNT] = series
                .try_into()
                .map_err(|_| anyhow!("expected {} series values", SERIES_COUNT))?;
            let score = store
                .update_score_series(&id, series)
                .await?
                .ok_or_else(|| anyhow!("no score {}", id))?;
            print_json(&score)?;
        }
        Commands::DeleteScore { id } => {
            let score = store
                .delete_score(&id)
                .await?
                .ok_or_else(|| anyhow!("no score {}", id))?;
            print_json(&score)?;
        }
        Commands::DeletePlayer { name } => {
            let Some(player) = store.find_player_by_name(&name).await? else {
                bail!("no player named {}", name);
            };
            if let Some((player, removed)) = store.delete_player(&player.id).await? {
                tracing::info!("Deleted {} with {} scores", player.name, removed);
            }
        }
    }

    Ok(())
}
