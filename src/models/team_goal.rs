//! Team target scores.

use serde::{Deserialize, Serialize};

use super::Gender;

/// A team's target score for one event and division.
///
/// At most one goal exists per (event, gender); the store enforces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamGoal {
    pub event_name: String,
    pub gender: Gender,
    pub target_score: f64,
}

impl TeamGoal {
    pub fn new(event_name: impl Into<String>, gender: Gender, target_score: f64) -> Self {
        Self {
            event_name: event_name.into(),
            gender,
            target_score,
        }
    }

    pub fn matches(&self, event_name: &str, gender: Gender) -> bool {
        self.event_name == event_name && self.gender == gender
    }
}
