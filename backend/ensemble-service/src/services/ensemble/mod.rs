/// Ensemble Builder - greedy, similarity-aware member selection
///
/// Seeds the ensemble with one submission, then repeatedly adds the pool
/// candidate with the best diversity-adjusted score. Similarity is measured
/// against the blend of the current ensemble rather than the last member,
/// so the target moves as the ensemble grows.
mod pool;

pub use pool::{Ensemble, Pool, PoolEntry};

use rand::Rng;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::EnsembleConfig;
use crate::error::{EnsembleError, Result};
use crate::models::{ResultSetId, UserRecommendations};
use crate::services::blending::ResultBlender;
use crate::services::popularity::PopularityTable;
use crate::services::similarity::SimilarityEngine;
use crate::utils::{log_score, sqrt_score};

/// How the first member is chosen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstMember {
    /// Top-scoring result set
    #[default]
    Best,
    /// Uniformly drawn from the pool
    Random,
}

impl FirstMember {
    pub fn as_str(&self) -> &'static str {
        match self {
            FirstMember::Best => "best",
            FirstMember::Random => "random",
        }
    }
}

impl FromStr for FirstMember {
    type Err = EnsembleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "best" => Ok(FirstMember::Best),
            "random" => Ok(FirstMember::Random),
            other => Err(EnsembleError::Configuration(format!(
                "Unknown first member: {other}"
            ))),
        }
    }
}

/// Quality term multiplied by `(1 - similarity)` when ranking candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiversityWeight {
    #[default]
    Score,
    SqrtScore,
    LogScore,
    /// `|full pool| - rank + 1`, so the top submission weighs the most.
    ///
    /// Ranks stay fixed to the full score-sorted pool; they are not
    /// renumbered over the shrinking pool of remaining candidates.
    Rank,
}

impl DiversityWeight {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiversityWeight::Score => "score",
            DiversityWeight::SqrtScore => "sqrt_score",
            DiversityWeight::LogScore => "log_score",
            DiversityWeight::Rank => "rank",
        }
    }

    pub fn adjusted_score(&self, candidate: &PoolEntry, similarity: f64, pool_size: usize) -> f64 {
        let quality = match self {
            DiversityWeight::Score => candidate.score(),
            DiversityWeight::SqrtScore => sqrt_score(candidate.score()),
            DiversityWeight::LogScore => log_score(candidate.score()),
            DiversityWeight::Rank => (pool_size + 1).saturating_sub(candidate.rank()) as f64,
        };
        quality * (1.0 - similarity)
    }
}

impl FromStr for DiversityWeight {
    type Err = EnsembleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "score" => Ok(DiversityWeight::Score),
            "sqrt_score" => Ok(DiversityWeight::SqrtScore),
            "log_score" => Ok(DiversityWeight::LogScore),
            "rank" => Ok(DiversityWeight::Rank),
            other => Err(EnsembleError::Configuration(format!(
                "Unknown diversity weight: {other}"
            ))),
        }
    }
}

impl fmt::Display for DiversityWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a run between selection steps
#[derive(Debug, Clone)]
pub struct BuildState {
    pub pool: Pool,
    pub ensemble: Ensemble,
    /// Blend of `ensemble`, the similarity target for the next pick
    pub blend: UserRecommendations,
}

/// The winning candidate of one selection pass
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Index into the current pool snapshot
    pub index: usize,
    pub similarity: f64,
    pub adjusted_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// 1-based position of the new member
    pub member_number: usize,
    pub member: ResultSetId,
    pub score: f64,
    /// Similarity to the blend before this member joined; `None` for the seed
    pub similarity: Option<f64>,
    /// Similarity between the new blend and the previous one
    pub cross_similarity: Option<f64>,
}

/// Receives every intermediate blend as the ensemble grows
pub trait ProgressSink {
    fn member_added(&mut self, report: &StepReport, blend: &UserRecommendations) -> Result<()>;
}

impl ProgressSink for () {
    fn member_added(&mut self, _report: &StepReport, _blend: &UserRecommendations) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EnsembleOutcome {
    pub ensemble: Ensemble,
    pub recommendations: UserRecommendations,
    pub steps: Vec<StepReport>,
    /// Members missing because the pool ran dry
    pub shortfall: usize,
}

pub struct EnsembleBuilder {
    config: EnsembleConfig,
    blender: ResultBlender,
}

impl EnsembleBuilder {
    /// Validates the configuration up front; nothing runs on a bad config
    pub fn new(config: EnsembleConfig) -> Result<Self> {
        config.validate()?;
        let blender = ResultBlender::new(config.blending_weight, config.repo_recommendations_per_user);
        Ok(Self { config, blender })
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    pub fn blender(&self) -> &ResultBlender {
        &self.blender
    }

    /// Similarity engine for this run, with popularities when the metric needs them
    pub fn similarity_engine(&self, pool: &Pool) -> SimilarityEngine {
        let engine = SimilarityEngine::new(self.config.similarity_measure);
        if !self.config.similarity_measure.needs_popularity() {
            return engine;
        }

        info!("Calculating item popularities within result sets");
        let table = PopularityTable::from_result_sets(pool.result_sets());
        table.log_top(10);
        engine.with_popularity(table)
    }

    pub fn build<R: Rng>(
        &self,
        pool: Pool,
        rng: &mut R,
        sink: &mut dyn ProgressSink,
    ) -> Result<EnsembleOutcome> {
        let target = self.config.size;
        if pool.len() <= target {
            return Err(EnsembleError::InsufficientPool {
                available: pool.len(),
                required: target,
            });
        }

        let engine = self.similarity_engine(&pool);
        info!(
            ensemble_size = target,
            pool_size = pool.len(),
            similarity = %engine.measure(),
            diversity_weight = %self.config.diversity_weight,
            "Forming ensemble"
        );

        let mut state = self.seed(pool, rng);
        let mut steps = Vec::with_capacity(target);

        if let Some(seed) = state.ensemble.last() {
            info!(member = %seed.result_set(), "Seeding ensemble");
            let report = StepReport {
                member_number: 1,
                member: seed.id().clone(),
                score: seed.score(),
                similarity: None,
                cross_similarity: None,
            };
            sink.member_added(&report, &state.blend)?;
            steps.push(report);
        }

        while state.ensemble.len() < target {
            let Some(selection) = self.select_next(&state, &engine) else {
                break;
            };

            let previous_blend = state.blend.pair_set();
            state = self.apply(state, &selection);

            let cross_similarity = engine.similarity(&state.blend.pair_set(), &previous_blend);
            let Some(member) = state.ensemble.last() else {
                break;
            };
            info!(
                member = %member.result_set(),
                similarity = selection.similarity,
                adjusted_score = selection.adjusted_score,
                cross_similarity = cross_similarity,
                "Added ensemble member"
            );

            let report = StepReport {
                member_number: state.ensemble.len(),
                member: member.id().clone(),
                score: member.score(),
                similarity: Some(selection.similarity),
                cross_similarity: Some(cross_similarity),
            };
            sink.member_added(&report, &state.blend)?;
            steps.push(report);
        }

        let shortfall = target - state.ensemble.len();
        if shortfall > 0 {
            warn!(
                requested = target,
                formed = state.ensemble.len(),
                shortfall = shortfall,
                "Pool exhausted before reaching ensemble size"
            );
        }

        Ok(EnsembleOutcome {
            ensemble: state.ensemble,
            recommendations: state.blend,
            steps,
            shortfall,
        })
    }

    /// Choose the first member and remove it (and, without replacement, its repo) from the pool
    pub fn seed<R: Rng>(&self, pool: Pool, rng: &mut R) -> BuildState {
        let mut ensemble = Ensemble::new(pool.full_size());
        if pool.is_empty() {
            return BuildState {
                pool,
                ensemble,
                blend: UserRecommendations::new(),
            };
        }

        let index = match self.config.first_member {
            FirstMember::Best => 0,
            FirstMember::Random => rng.gen_range(0..pool.len()),
        };
        let chosen = pool.entries()[index].clone();
        let pool = pool.without(chosen.id(), self.config.allow_replacement);
        ensemble.push(chosen);
        let blend = self.blender.blend(&ensemble);

        BuildState {
            pool,
            ensemble,
            blend,
        }
    }

    /// Best candidate by diversity-adjusted score; first encountered wins ties.
    ///
    /// Returns `None` when no candidate remains.
    pub fn select_next(&self, state: &BuildState, engine: &SimilarityEngine) -> Option<Selection> {
        let target = state.blend.pair_set();
        let previous = state.ensemble.last().map(PoolEntry::id);
        let pool_size = state.pool.full_size();

        let mut best: Option<Selection> = None;
        for (index, candidate) in state.pool.entries().iter().enumerate() {
            // Never pick the member added last, even if duplicates are allowed
            if previous == Some(candidate.id()) {
                continue;
            }

            let similarity = engine.similarity(candidate.result_set().pair_set(), &target);
            let adjusted_score = self
                .config
                .diversity_weight
                .adjusted_score(candidate, similarity, pool_size);
            if adjusted_score.is_nan() {
                continue;
            }

            if best
                .as_ref()
                .map_or(true, |current| adjusted_score > current.adjusted_score)
            {
                best = Some(Selection {
                    index,
                    similarity,
                    adjusted_score,
                });
            }
        }

        best
    }

    /// Append the selected candidate and return the next snapshot
    pub fn apply(&self, state: BuildState, selection: &Selection) -> BuildState {
        let BuildState {
            pool, mut ensemble, ..
        } = state;

        let chosen = pool.entries()[selection.index].clone();
        let pool = pool.without(chosen.id(), self.config.allow_replacement);
        ensemble.push(chosen);
        let blend = self.blender.blend(&ensemble);

        BuildState {
            pool,
            ensemble,
            blend,
        }
    }
}
