use anyhow::Context;
use ensemble_service::{
    config::SourceMode,
    services::{
        loader::{CacheDirSource, HttpSource, ResultSetSource},
        output::{load_manifest, ResultsWriter},
    },
    Config, EnsembleService, Loader,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load config; bad enum values stop here before any loading
    let config = Config::from_env().context("Failed to load config")?;

    info!(
        ensemble_size = config.ensemble.size,
        similarity = %config.ensemble.similarity_measure,
        blending = %config.ensemble.blending_weight,
        "Starting ensemble-service"
    );

    let users = load_manifest(&config.output.manifest_path).with_context(|| {
        format!(
            "Failed to read user manifest {}",
            config.output.manifest_path.display()
        )
    })?;
    let writer = ResultsWriter::new(users, &config.output.results_file);
    let service = EnsembleService::new(config.ensemble.clone(), writer)?;

    let cache = CacheDirSource::new(&config.source.cache_dir);
    let source: Box<dyn ResultSetSource> = match (config.source.mode, &config.source.base_url) {
        (SourceMode::Http, Some(base_url)) => Box::new(HttpSource::new(
            base_url,
            config.source.request_delay(),
            cache,
        )),
        _ => Box::new(cache),
    };

    let loader = Loader::new(config.loader.clone());
    let pool = EnsembleService::load_pool(&loader, source.as_ref()).await?;

    let outcome = service.run(pool)?;
    if outcome.shortfall > 0 {
        warn!(
            shortfall = outcome.shortfall,
            "Ensemble is smaller than requested"
        );
    }

    info!(members = outcome.ensemble.len(), "Done");
    Ok(())
}
