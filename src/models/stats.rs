//! Derived statistics models.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Average / best / count of `total` over a group of scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    /// Mean total, rounded to one decimal place
    pub avg: f64,

    /// Best total, rounded to one decimal place
    pub max: f64,

    /// Number of scores in the group
    pub count: u32,
}

/// Inclusive date range; open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    /// Unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn since(from: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: None,
        }
    }

    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |f| date >= f) && self.to.map_or(true, |t| date <= t)
    }
}

/// Rendering hints attached to a chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStyle {
    pub border_color: String,
    pub background_color: String,

    /// Dash pattern; empty for a solid line
    pub border_dash: Vec<u32>,

    /// Renderers should draw across gap markers
    pub span_gaps: bool,
}

/// One line on a chart, aligned to the chart's labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,

    /// One value per label; `None` marks a period without data
    pub data: Vec<Option<f64>>,

    pub style: SeriesStyle,
}

/// A chart: a shared label axis plus its series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

impl ChartData {
    pub fn dataset(&self, label: &str) -> Option<&Dataset> {
        self.datasets.iter().find(|d| d.label == label)
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
