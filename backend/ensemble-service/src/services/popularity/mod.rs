use std::collections::HashMap;
use tracing::{debug, info};

use crate::models::ResultSet;

/// Relative frequency of every item across all loaded result sets.
///
/// An item's frequency is its occurrence count divided by the total number
/// of `(user, item)` observations in the pool. A pair repeated by several
/// result sets counts once per result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopularityTable {
    frequencies: HashMap<String, f64>,
    total_observations: usize,
}

impl PopularityTable {
    pub fn from_result_sets<'a, I>(result_sets: I) -> Self
    where
        I: IntoIterator<Item = &'a ResultSet>,
    {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut total_observations = 0usize;

        for rs in result_sets {
            for (_, item) in rs.results() {
                *counts.entry(item.clone()).or_insert(0) += 1;
                total_observations += 1;
            }
        }

        let frequencies = counts
            .into_iter()
            .map(|(item, count)| (item, count as f64 / total_observations as f64))
            .collect();

        debug!(
            total_observations = total_observations,
            "Item popularities computed"
        );

        Self {
            frequencies,
            total_observations,
        }
    }

    /// Frequency of `item` in [0, 1]; unseen items are 0
    pub fn popularity(&self, item: &str) -> f64 {
        self.frequencies.get(item).copied().unwrap_or(0.0)
    }

    pub fn total_observations(&self) -> usize {
        self.total_observations
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.frequencies.iter().map(|(item, f)| (item.as_str(), *f))
    }

    /// The `n` most frequent items, ties broken by item id
    pub fn top(&self, n: usize) -> Vec<(&str, f64)> {
        let mut items: Vec<(&str, f64)> = self.iter().collect();
        items.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        items.truncate(n);
        items
    }

    pub fn log_top(&self, n: usize) {
        for (i, (item, frequency)) in self.top(n).into_iter().enumerate() {
            info!(rank = i + 1, item = item, frequency = frequency, "Popular item");
        }
    }
}
