mod cache_source;
mod http_source;
mod parser;

use async_trait::async_trait;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::config::LoaderConfig;
use crate::error::{EnsembleError, Result};
use crate::models::{ResultSet, ResultSetMeta};

pub use cache_source::CacheDirSource;
pub use http_source::HttpSource;
pub use parser::parse_results;

/// Provider of submission metadata and raw `user:item,...` result text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResultSetSource: Send + Sync {
    async fn list(&self) -> anyhow::Result<Vec<ResultSetMeta>>;
    async fn fetch(&self, meta: &ResultSetMeta) -> anyhow::Result<String>;
    fn name(&self) -> &'static str;
}

/// Loader: filters the listing, then materializes each surviving result set
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    /// Apply leaderboard, score, ignore-list and per-repo / total caps.
    ///
    /// The result is score-sorted descending; equal scores keep listing order.
    pub fn filter(&self, metas: Vec<ResultSetMeta>) -> Vec<ResultSetMeta> {
        let mut by_repo: Vec<(String, Vec<ResultSetMeta>)> = Vec::new();
        let mut repo_index: HashMap<String, usize> = HashMap::new();

        for meta in self.leaderboard_head(metas) {
            let key = meta.id().repo_key();
            if self.config.ignore_repos.contains(&key) {
                debug!(repo = %key, "Skipping ignored repo");
                continue;
            }
            if !meta.score.is_finite() || meta.score < 0.0 {
                debug!(submission = %meta, "Skipping invalid score");
                continue;
            }
            if let Some(min_score) = self.config.min_score {
                if meta.score <= min_score {
                    debug!(submission = %meta, min_score = min_score, "Skipping low score");
                    continue;
                }
            }

            let slot = *repo_index.entry(key.clone()).or_insert_with(|| {
                by_repo.push((key, Vec::new()));
                by_repo.len() - 1
            });
            by_repo[slot].1.push(meta);
        }

        let mut kept = Vec::new();
        for (_, mut commits) in by_repo {
            commits.sort_by(|a, b| b.score.total_cmp(&a.score));
            if let Some(n) = self.config.top_n_commits_per_repo {
                commits.truncate(n);
            }
            kept.extend(commits);
        }

        kept.sort_by(|a, b| b.score.total_cmp(&a.score));
        if let Some(n) = self.config.top_n_commits_total {
            kept.truncate(n);
        }
        kept
    }

    /// Submissions from the first `top_n_from_leaderboard` repos in listing
    /// order. Ignored repos do not count toward the cap.
    fn leaderboard_head(&self, metas: Vec<ResultSetMeta>) -> Vec<ResultSetMeta> {
        let Some(limit) = self.config.top_n_from_leaderboard else {
            return metas;
        };

        let mut admitted: Vec<String> = Vec::new();
        metas
            .into_iter()
            .filter(|meta| {
                let key = meta.id().repo_key();
                if self.config.ignore_repos.contains(&key) || admitted.contains(&key) {
                    return true;
                }
                if admitted.len() < limit {
                    admitted.push(key);
                    return true;
                }
                false
            })
            .collect()
    }

    /// List, filter and fetch. Unavailable result sets are logged and dropped.
    pub async fn load(&self, source: &dyn ResultSetSource) -> Result<Vec<ResultSet>> {
        let listed = source
            .list()
            .await
            .map_err(|e| EnsembleError::Source(format!("{} listing failed: {e:#}", source.name())))?;
        let listed_count = listed.len();
        let metas = self.filter(listed);

        let mut loaded = Vec::with_capacity(metas.len());
        for meta in metas {
            match source.fetch(&meta).await {
                Ok(raw) => {
                    let rs = ResultSet::new(&meta, parse_results(&raw));
                    debug!(submission = %meta, pairs = rs.len(), "Loaded result set");
                    loaded.push(rs);
                }
                Err(e) => {
                    let err = EnsembleError::Unavailable {
                        id: meta.id(),
                        reason: format!("{e:#}"),
                    };
                    warn!(error = %err, "Dropping unavailable result set");
                }
            }
        }

        info!(
            source = source.name(),
            listed = listed_count,
            loaded = loaded.len(),
            "Result sets loaded"
        );

        Ok(loaded)
    }
}
