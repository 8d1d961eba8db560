//! # Shooting Tracker
//!
//! Score records, statistics and rankings for a university shooting team.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (players, scores, team goals, charts)
//! - **calculate**: Season windows, grouped stats, ranks and chart series
//! - **storage**: Filesystem record store (JSONL)
//! - **ingest**: CSV score import
//! - **reports**: Dashboard, player, ranking and competition views
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod calculate;
pub mod config;
pub mod ingest;
pub mod models;
pub mod reports;
pub mod storage;

pub use models::*;
