use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::EnsembleError;
use crate::models::Pair;
use crate::services::popularity::PopularityTable;
use crate::utils::ratio;

/// Set-similarity metric, fixed for a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMeasure {
    /// |A ∩ B| / |A ∪ B|
    #[default]
    Jaccard,
    /// 2|A ∩ B| / (|A| + |B|)
    Dice,
    /// Σ (1 - popularity(item)) over A ∩ B, divided by |A ∪ B|
    InversePopularityWeightedJaccard,
}

impl SimilarityMeasure {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMeasure::Jaccard => "jaccard",
            SimilarityMeasure::Dice => "dice",
            SimilarityMeasure::InversePopularityWeightedJaccard => {
                "inverse_popularity_weighted_jaccard"
            }
        }
    }

    pub fn needs_popularity(&self) -> bool {
        matches!(self, SimilarityMeasure::InversePopularityWeightedJaccard)
    }
}

impl fmt::Display for SimilarityMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMeasure {
    type Err = EnsembleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jaccard" => Ok(SimilarityMeasure::Jaccard),
            "dice" => Ok(SimilarityMeasure::Dice),
            "inverse_popularity_weighted_jaccard" => {
                Ok(SimilarityMeasure::InversePopularityWeightedJaccard)
            }
            other => Err(EnsembleError::Configuration(format!(
                "Unknown similarity measure: {other}"
            ))),
        }
    }
}

/// Similarity between two sets of `(user, item)` pairs.
///
/// Both arguments are sets, so order and duplicates never matter and
/// `similarity(a, b) == similarity(b, a)`. An empty denominator yields 0.
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    measure: SimilarityMeasure,
    popularity: PopularityTable,
}

impl SimilarityEngine {
    pub fn new(measure: SimilarityMeasure) -> Self {
        Self {
            measure,
            popularity: PopularityTable::default(),
        }
    }

    /// Attach the popularity table used by the weighted Jaccard variant
    pub fn with_popularity(mut self, popularity: PopularityTable) -> Self {
        self.popularity = popularity;
        self
    }

    pub fn measure(&self) -> SimilarityMeasure {
        self.measure
    }

    pub fn popularity(&self) -> &PopularityTable {
        &self.popularity
    }

    pub fn similarity(&self, a: &HashSet<Pair>, b: &HashSet<Pair>) -> f64 {
        // Iterate the smaller set for the intersection
        let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        let intersection = small.iter().filter(|pair| large.contains(*pair));

        match self.measure {
            SimilarityMeasure::Jaccard => {
                let shared = intersection.count();
                let union = a.len() + b.len() - shared;
                ratio(shared as f64, union as f64)
            }
            SimilarityMeasure::Dice => {
                let shared = intersection.count();
                ratio(2.0 * shared as f64, (a.len() + b.len()) as f64)
            }
            SimilarityMeasure::InversePopularityWeightedJaccard => {
                let mut shared = 0usize;
                let mut weighted = 0.0;
                for (_, item) in intersection {
                    shared += 1;
                    weighted += 1.0 - self.popularity.popularity(item);
                }
                let union = a.len() + b.len() - shared;
                ratio(weighted, union as f64)
            }
        }
    }
}
