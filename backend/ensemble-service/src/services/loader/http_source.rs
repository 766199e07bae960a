use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{CacheDirSource, ResultSetSource};
use crate::models::ResultSetMeta;

/// Remote leaderboard listing plus per-commit result downloads.
///
/// Every network request is followed by `request_delay`, and every download
/// is written to the cache directory; cached blobs are served without a
/// request.
pub struct HttpSource {
    client: Client,
    base_url: String,
    request_delay: Duration,
    cache: CacheDirSource,
}

impl HttpSource {
    pub fn new(base_url: &str, request_delay: Duration, cache: CacheDirSource) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            request_delay,
            cache,
        }
    }

    pub fn leaderboard_url(&self) -> String {
        format!("{}/leaderboard.json", self.base_url)
    }

    pub fn results_url(&self, meta: &ResultSetMeta) -> String {
        format!(
            "{}/{}/{}/{}/results.txt",
            self.base_url, meta.owner, meta.repo, meta.commit
        )
    }

    /// Write a downloaded blob through to the cache. A cache failure does
    /// not make the download unavailable.
    async fn keep_download(&self, meta: &ResultSetMeta, raw: String) -> String {
        if let Err(e) = self.cache.store(meta, &raw).await {
            warn!(submission = %meta, error = %format!("{e:#}"), "Failed to cache results");
        }
        raw
    }

    async fn pause(&self) {
        if !self.request_delay.is_zero() {
            debug!(
                delay_secs = self.request_delay.as_secs_f64(),
                "Sleeping between requests"
            );
            tokio::time::sleep(self.request_delay).await;
        }
    }
}

#[async_trait]
impl ResultSetSource for HttpSource {
    async fn list(&self) -> Result<Vec<ResultSetMeta>> {
        let url = self.leaderboard_url();
        info!(url = %url, "Fetching leaderboard");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?
            .error_for_status()
            .with_context(|| format!("leaderboard request {url}"))?;
        let metas = response
            .json::<Vec<ResultSetMeta>>()
            .await
            .context("parsing leaderboard")?;
        self.pause().await;

        Ok(metas)
    }

    async fn fetch(&self, meta: &ResultSetMeta) -> Result<String> {
        if self.cache.contains(meta).await {
            return self.cache.fetch(meta).await;
        }

        let url = self.results_url(meta);
        info!(url = %url, "Fetching results");

        let result: Result<String> = async {
            self.client
                .get(&url)
                .send()
                .await
                .with_context(|| format!("requesting {url}"))?
                .error_for_status()
                .with_context(|| format!("results request {url}"))?
                .text()
                .await
                .with_context(|| format!("reading body of {url}"))
        }
        .await;
        self.pause().await;

        let raw = result?;
        Ok(self.keep_download(meta, raw).await)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
