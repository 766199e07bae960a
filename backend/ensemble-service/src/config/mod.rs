use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{EnsembleError, Result};
use crate::services::blending::BlendingWeight;
use crate::services::ensemble::{DiversityWeight, FirstMember};
use crate::services::similarity::SimilarityMeasure;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub ensemble: EnsembleConfig,
    pub loader: LoaderConfig,
    pub source: SourceConfig,
    pub output: OutputConfig,
}

/// Run configuration for one ensemble build (`ENSEMBLE_*`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EnsembleConfig {
    #[serde(default = "default_ensemble_size")]
    pub size: usize,
    #[serde(default)]
    pub similarity_measure: SimilarityMeasure,
    #[serde(default)]
    pub first_member: FirstMember,
    #[serde(default)]
    pub diversity_weight: DiversityWeight,
    #[serde(default)]
    pub blending_weight: BlendingWeight,
    #[serde(default = "default_recommendations_per_user")]
    pub repo_recommendations_per_user: usize,
    #[serde(default)]
    pub allow_replacement: bool,
    #[serde(default = "default_true")]
    pub save_intermediate_results: bool,
    /// Seed for `first_member = random`; entropy-seeded when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            size: default_ensemble_size(),
            similarity_measure: SimilarityMeasure::default(),
            first_member: FirstMember::default(),
            diversity_weight: DiversityWeight::default(),
            blending_weight: BlendingWeight::default(),
            repo_recommendations_per_user: default_recommendations_per_user(),
            allow_replacement: false,
            save_intermediate_results: true,
            seed: None,
        }
    }
}

impl EnsembleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(EnsembleError::Configuration(
                "ensemble size must be greater than zero".to_string(),
            ));
        }
        if self.repo_recommendations_per_user == 0 {
            return Err(EnsembleError::Configuration(
                "repo_recommendations_per_user must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Submission filters applied before any result text is fetched (`LOADER_*`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoaderConfig {
    /// Drop submissions scoring at or below this value
    #[serde(default)]
    pub min_score: Option<f64>,
    /// `owner/repo` entries never considered
    #[serde(default)]
    pub ignore_repos: Vec<String>,
    #[serde(default = "default_commits_per_repo")]
    pub top_n_commits_per_repo: Option<usize>,
    #[serde(default)]
    pub top_n_commits_total: Option<usize>,
    /// Only the first N repos of the listing are considered
    #[serde(default)]
    pub top_n_from_leaderboard: Option<usize>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            min_score: None,
            ignore_repos: Vec::new(),
            top_n_commits_per_repo: default_commits_per_repo(),
            top_n_commits_total: None,
            top_n_from_leaderboard: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    /// Read previously fetched results from the cache directory only
    #[default]
    Cache,
    /// List and fetch over HTTP, filling the cache directory
    Http,
}

/// Result-set provider settings (`SOURCE_*`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub mode: SourceMode,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_request_delay_secs")]
    pub request_delay_secs: u64,
}

impl SourceConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs(self.request_delay_secs)
    }
}

/// Output locations (`OUTPUT_*`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputConfig {
    /// Base name; final results land in `<results_file>.txt`
    #[serde(default = "default_results_file")]
    pub results_file: String,
    /// User ids to emit, one per line
    #[serde(default = "default_manifest_path")]
    pub manifest_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let config = Config {
            ensemble: envy::prefixed("ENSEMBLE_").from_env::<EnsembleConfig>()?,
            loader: envy::prefixed("LOADER_").from_env::<LoaderConfig>()?,
            source: envy::prefixed("SOURCE_").from_env::<SourceConfig>()?,
            output: envy::prefixed("OUTPUT_").from_env::<OutputConfig>()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.ensemble.validate()?;
        if self.source.mode == SourceMode::Http && self.source.base_url.is_none() {
            return Err(EnsembleError::Configuration(
                "SOURCE_BASE_URL is required when SOURCE_MODE=http".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_ensemble_size() -> usize {
    10
}

fn default_recommendations_per_user() -> usize {
    10
}

fn default_true() -> bool {
    true
}

fn default_commits_per_repo() -> Option<usize> {
    Some(1)
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("results")
}

fn default_request_delay_secs() -> u64 {
    15
}

fn default_results_file() -> String {
    "results".to_string()
}

fn default_manifest_path() -> PathBuf {
    PathBuf::from("data/test.txt")
}
