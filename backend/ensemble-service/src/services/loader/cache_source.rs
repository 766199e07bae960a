use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ResultSetSource;
use crate::models::ResultSetMeta;

const FILE_PREFIX: &str = "results.";
const FILE_SUFFIX: &str = ".txt";

/// Result sets previously fetched into a local directory.
///
/// Files are named `results.<owner>.<repo>.<commit>.<score>.txt`. Owner and
/// commit never contain dots, the repo may. A fractional score is written
/// with `_` in place of the decimal point.
#[derive(Debug, Clone)]
pub struct CacheDirSource {
    dir: PathBuf,
}

impl CacheDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(meta: &ResultSetMeta) -> String {
        let score = format!("{}", meta.score).replace('.', "_");
        format!(
            "{FILE_PREFIX}{}.{}.{}.{}{FILE_SUFFIX}",
            meta.owner, meta.repo, meta.commit, score
        )
    }

    pub fn parse_file_name(name: &str) -> Option<ResultSetMeta> {
        let body = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
        let (owner, rest) = body.split_once('.')?;
        let (rest, score) = rest.rsplit_once('.')?;
        let (repo, commit) = rest.rsplit_once('.')?;
        if owner.is_empty() || repo.is_empty() || commit.is_empty() {
            return None;
        }

        let score: f64 = score.replace('_', ".").parse().ok()?;
        if !score.is_finite() || score < 0.0 {
            return None;
        }

        Some(ResultSetMeta::new(owner, repo, commit, score))
    }

    pub fn path_for(&self, meta: &ResultSetMeta) -> PathBuf {
        self.dir.join(Self::file_name(meta))
    }

    pub async fn contains(&self, meta: &ResultSetMeta) -> bool {
        tokio::fs::try_exists(self.path_for(meta))
            .await
            .unwrap_or(false)
    }

    pub async fn store(&self, meta: &ResultSetMeta, raw: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating cache dir {}", self.dir.display()))?;
        let path = self.path_for(meta);
        tokio::fs::write(&path, raw)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        debug!(path = %path.display(), "Cached raw results");
        Ok(())
    }
}

#[async_trait]
impl ResultSetSource for CacheDirSource {
    async fn list(&self) -> Result<Vec<ResultSetMeta>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("reading cache dir {}", self.dir.display()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        // read_dir order is platform dependent
        names.sort();

        Ok(names
            .iter()
            .filter_map(|name| Self::parse_file_name(name))
            .collect())
    }

    async fn fetch(&self, meta: &ResultSetMeta) -> Result<String> {
        let path = self.path_for(meta);
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }

    fn name(&self) -> &'static str {
        "cache"
    }
}
