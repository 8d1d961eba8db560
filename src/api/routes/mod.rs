pub mod dashboard;
pub mod export;
pub mod goals;
pub mod health;
pub mod import;
pub mod matches;
pub mod players;
pub mod ranking;
pub mod scores;
