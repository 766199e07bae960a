use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::EnsembleError;
use crate::models::{ScoredItem, UserRecommendations};
use crate::services::ensemble::{Ensemble, PoolEntry};
use crate::utils::{log_score, sqrt_score};

/// Vote weight given to every recommendation of one ensemble member
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendingWeight {
    /// 1 for every member
    Equal,
    /// `|ensemble| - position`, earlier members weigh more
    RankWithinEnsemble,
    /// `|full pool| - rank` in the original score-sorted pool
    #[default]
    RankWithinResultset,
    Score,
    SqrtScore,
    LogScore,
}

impl BlendingWeight {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlendingWeight::Equal => "equal",
            BlendingWeight::RankWithinEnsemble => "rank_within_ensemble",
            BlendingWeight::RankWithinResultset => "rank_within_resultset",
            BlendingWeight::Score => "score",
            BlendingWeight::SqrtScore => "sqrt_score",
            BlendingWeight::LogScore => "log_score",
        }
    }

    /// Weight of `member` sitting at 1-based `position` in an ensemble of `ensemble_len`
    pub fn member_weight(
        &self,
        member: &PoolEntry,
        position: usize,
        ensemble_len: usize,
        pool_size: usize,
    ) -> f64 {
        match self {
            BlendingWeight::Equal => 1.0,
            BlendingWeight::RankWithinEnsemble => ensemble_len.saturating_sub(position) as f64,
            BlendingWeight::RankWithinResultset => pool_size.saturating_sub(member.rank()) as f64,
            BlendingWeight::Score => member.score(),
            BlendingWeight::SqrtScore => sqrt_score(member.score()),
            BlendingWeight::LogScore => log_score(member.score()),
        }
    }
}

impl fmt::Display for BlendingWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlendingWeight {
    type Err = EnsembleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" => Ok(BlendingWeight::Equal),
            "rank_within_ensemble" => Ok(BlendingWeight::RankWithinEnsemble),
            "rank_within_resultset" => Ok(BlendingWeight::RankWithinResultset),
            "score" => Ok(BlendingWeight::Score),
            "sqrt_score" => Ok(BlendingWeight::SqrtScore),
            "log_score" => Ok(BlendingWeight::LogScore),
            other => Err(EnsembleError::Configuration(format!(
                "Unknown blending weight: {other}"
            ))),
        }
    }
}

/// Items voted for one user, in first-contribution order
#[derive(Default)]
struct UserTally {
    items: Vec<ScoredItem>,
    index: HashMap<String, usize>,
}

impl UserTally {
    fn vote(&mut self, item: &str, weight: f64) {
        match self.index.get(item) {
            Some(&i) => self.items[i].weight += weight,
            None => {
                self.index.insert(item.to_string(), self.items.len());
                self.items.push(ScoredItem {
                    item: item.to_string(),
                    weight,
                });
            }
        }
    }
}

/// Weighted voting over an ensemble's recommendations
#[derive(Debug, Clone)]
pub struct ResultBlender {
    weight: BlendingWeight,
    per_user: usize,
}

impl ResultBlender {
    pub fn new(weight: BlendingWeight, per_user: usize) -> Self {
        Self { weight, per_user }
    }

    pub fn weight(&self) -> BlendingWeight {
        self.weight
    }

    /// Sum member weights per `(user, item)` and keep each user's top items.
    ///
    /// Equal weights keep first-contribution order (stable sort). The
    /// ensemble is only read.
    pub fn blend(&self, ensemble: &Ensemble) -> UserRecommendations {
        let mut tallies: HashMap<&str, UserTally> = HashMap::new();

        for (i, member) in ensemble.members().iter().enumerate() {
            let weight =
                self.weight
                    .member_weight(member, i + 1, ensemble.len(), ensemble.pool_size());

            for (user, item) in member.result_set().results() {
                tallies.entry(user.as_str()).or_default().vote(item, weight);
            }
        }

        let mut recommendations = UserRecommendations::new();
        for (user, tally) in tallies {
            let mut items = tally.items;
            items.sort_by(|a, b| b.weight.total_cmp(&a.weight));
            items.truncate(self.per_user);
            recommendations.insert(user.to_string(), items);
        }

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResultSet, ResultSetMeta};
    use crate::services::ensemble::Pool;

    fn rs(owner: &str, score: f64, recs: &[(&str, &str)]) -> ResultSet {
        ResultSet::new(
            &ResultSetMeta::new(owner, "recs", "c1", score),
            recs.iter().map(|(u, i)| (u.to_string(), i.to_string())),
        )
    }

    /// Ensemble of every pool entry, in pool order
    fn ensemble_of(pool: &Pool) -> Ensemble {
        let mut ensemble = Ensemble::new(pool.full_size());
        for entry in pool.entries() {
            ensemble.push(entry.clone());
        }
        ensemble
    }

    fn weights(recs: &UserRecommendations, user: &str) -> Vec<(String, f64)> {
        recs.get(user)
            .iter()
            .map(|s| (s.item.clone(), s.weight))
            .collect()
    }

    #[test]
    fn test_equal_weights_sum_votes() {
        let pool = Pool::new(vec![
            rs("a", 100.0, &[("u1", "r1"), ("u1", "r2")]),
            rs("b", 90.0, &[("u1", "r1"), ("u1", "r2"), ("u1", "r3")]),
        ]);
        let blender = ResultBlender::new(BlendingWeight::Equal, 10);

        let recs = blender.blend(&ensemble_of(&pool));

        assert_eq!(
            weights(&recs, "u1"),
            vec![
                ("r1".to_string(), 2.0),
                ("r2".to_string(), 2.0),
                ("r3".to_string(), 1.0)
            ]
        );
    }

    #[test]
    fn test_truncates_per_user() {
        let pool = Pool::new(vec![
            rs("a", 100.0, &[("u1", "r1"), ("u1", "r2"), ("u2", "r5")]),
            rs("b", 90.0, &[("u1", "r2"), ("u1", "r3")]),
        ]);
        let blender = ResultBlender::new(BlendingWeight::Equal, 1);

        let recs = blender.blend(&ensemble_of(&pool));

        assert_eq!(weights(&recs, "u1"), vec![("r2".to_string(), 2.0)]);
        assert_eq!(weights(&recs, "u2"), vec![("r5".to_string(), 1.0)]);
    }

    #[test]
    fn test_ties_keep_first_contribution_order() {
        let pool = Pool::new(vec![
            rs("a", 100.0, &[("u1", "9")]),
            rs("b", 90.0, &[("u1", "1")]),
        ]);
        let blender = ResultBlender::new(BlendingWeight::Equal, 1);

        let recs = blender.blend(&ensemble_of(&pool));

        assert_eq!(weights(&recs, "u1"), vec![("9".to_string(), 1.0)]);
    }

    #[test]
    fn test_single_member_reproduces_recommendations() {
        let pool = Pool::new(vec![rs("a", 100.0, &[("u1", "r1"), ("u1", "r2"), ("u2", "r3")])]);
        let blender = ResultBlender::new(BlendingWeight::Score, 10);

        let recs = blender.blend(&ensemble_of(&pool));

        let items: Vec<_> = recs.get("u1").iter().map(|s| s.item.as_str()).collect();
        assert_eq!(items, vec!["r1", "r2"]);
        assert_eq!(recs.pair_set(), pool.entries()[0].result_set().pair_set().clone());
    }

    #[test]
    fn test_rank_within_resultset_weights() {
        let pool = Pool::new(vec![
            rs("a", 100.0, &[("u1", "r1")]),
            rs("b", 90.0, &[("u1", "r2")]),
            rs("c", 80.0, &[("u1", "r2")]),
        ]);
        let blender = ResultBlender::new(BlendingWeight::RankWithinResultset, 10);

        let recs = blender.blend(&ensemble_of(&pool));

        // a: 3 - 1 = 2, b: 3 - 2 = 1, c: 3 - 3 = 0
        assert_eq!(
            weights(&recs, "u1"),
            vec![("r1".to_string(), 2.0), ("r2".to_string(), 1.0)]
        );
    }

    #[test]
    fn test_rank_within_ensemble_weights() {
        let pool = Pool::new(vec![
            rs("a", 100.0, &[("u1", "r1")]),
            rs("b", 90.0, &[("u1", "r2")]),
            rs("c", 80.0, &[("u1", "r2")]),
        ]);
        let ensemble = ensemble_of(&pool);
        let entries = pool.entries();
        let weight = BlendingWeight::RankWithinEnsemble;

        assert_eq!(weight.member_weight(&entries[0], 1, 3, 3), 2.0);
        assert_eq!(weight.member_weight(&entries[2], 3, 3, 3), 0.0);

        let recs = ResultBlender::new(weight, 10).blend(&ensemble);
        assert_eq!(
            weights(&recs, "u1"),
            vec![("r1".to_string(), 2.0), ("r2".to_string(), 1.0)]
        );
    }

    #[test]
    fn test_score_transforms() {
        let pool = Pool::new(vec![rs("a", 100.0, &[("u1", "r1")])]);
        let entry = &pool.entries()[0];

        assert_eq!(BlendingWeight::Score.member_weight(entry, 1, 1, 1), 100.0);
        assert_eq!(BlendingWeight::SqrtScore.member_weight(entry, 1, 1, 1), 10.0);
        assert!((BlendingWeight::LogScore.member_weight(entry, 1, 1, 1) - 100f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_blend_does_not_mutate_ensemble() {
        let pool = Pool::new(vec![rs("a", 100.0, &[("u1", "r1")]), rs("b", 90.0, &[])]);
        let ensemble = ensemble_of(&pool);
        let blender = ResultBlender::new(BlendingWeight::Equal, 10);

        let first = blender.blend(&ensemble);
        let second = blender.blend(&ensemble);

        assert_eq!(first, second);
        assert_eq!(ensemble.len(), 2);
        assert!(first.get("nobody").is_empty());
    }

    #[test]
    fn test_unknown_weight_rejected() {
        assert!(matches!(
            "max".parse::<BlendingWeight>(),
            Err(EnsembleError::Configuration(_))
        ));
        assert_eq!(
            "rank_within_ensemble".parse::<BlendingWeight>().ok(),
            Some(BlendingWeight::RankWithinEnsemble)
        );
    }
}
