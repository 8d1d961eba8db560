//! Grouped average / best / count over score totals.

use std::collections::BTreeMap;

use crate::models::{DateRange, GroupStats};

use super::{round1, ScoreView};

/// Running sum / max / count for one group.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatsAccumulator {
    sum: f64,
    max: Option<f64>,
    count: u32,
}

impl StatsAccumulator {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        self.count += 1;
    }

    /// `None` when nothing was pushed.
    pub fn finish(&self) -> Option<GroupStats> {
        let max = self.max?;
        Some(GroupStats {
            avg: round1(self.sum / self.count as f64),
            max: round1(max),
            count: self.count,
        })
    }
}

/// Group scores by `key_fn` and compute stats for each group.
///
/// Scores outside `range` are skipped, as are scores for which `key_fn`
/// returns `None`; that is how callers express filters such as "recognized
/// gender only". Groups with no scores never appear in the output.
pub fn aggregate_by<'v, 'a: 'v, K, I, F>(
    views: I,
    range: &DateRange,
    mut key_fn: F,
) -> BTreeMap<K, GroupStats>
where
    K: Ord,
    I: IntoIterator<Item = &'v ScoreView<'a>>,
    F: FnMut(&ScoreView<'a>) -> Option<K>,
{
    let mut groups: BTreeMap<K, StatsAccumulator> = BTreeMap::new();

    for view in views {
        if !range.contains(view.score.date) {
            continue;
        }
        if let Some(key) = key_fn(view) {
            groups.entry(key).or_default().push(view.score.total);
        }
    }

    groups
        .into_iter()
        .filter_map(|(k, acc)| acc.finish().map(|s| (k, s)))
        .collect()
}
