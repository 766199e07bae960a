use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::EnsembleConfig;
use crate::error::Result;
use crate::models::UserRecommendations;
use crate::services::ensemble::{EnsembleBuilder, EnsembleOutcome, Pool, ProgressSink, StepReport};
use crate::services::loader::{Loader, ResultSetSource};
use crate::services::output::ResultsWriter;

/// Persists the blend after each added member when enabled
struct IntermediateResults<'a> {
    writer: &'a ResultsWriter,
    enabled: bool,
}

impl ProgressSink for IntermediateResults<'_> {
    fn member_added(&mut self, report: &StepReport, blend: &UserRecommendations) -> Result<()> {
        if self.enabled {
            self.writer
                .save(blend, &self.writer.intermediate_path(report.member_number))?;
        }
        Ok(())
    }
}

/// Loader → builder → blender → output, for one run
pub struct EnsembleService {
    builder: EnsembleBuilder,
    writer: ResultsWriter,
}

impl EnsembleService {
    pub fn new(config: EnsembleConfig, writer: ResultsWriter) -> Result<Self> {
        Ok(Self {
            builder: EnsembleBuilder::new(config)?,
            writer,
        })
    }

    pub fn builder(&self) -> &EnsembleBuilder {
        &self.builder
    }

    pub async fn load_pool(loader: &Loader, source: &dyn ResultSetSource) -> Result<Pool> {
        let result_sets = loader.load(source).await?;
        Ok(Pool::new(result_sets))
    }

    fn rng(&self) -> StdRng {
        match self.builder.config().seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Build the ensemble over `pool` and write the final results file
    pub fn run(&self, pool: Pool) -> Result<EnsembleOutcome> {
        let mut rng = self.rng();
        let mut sink = IntermediateResults {
            writer: &self.writer,
            enabled: self.builder.config().save_intermediate_results,
        };

        let outcome = self.builder.build(pool, &mut rng, &mut sink)?;

        for member in outcome.ensemble.members() {
            info!(
                member = %member.id(),
                score = member.score(),
                pool_rank = member.rank(),
                "Final ensemble member"
            );
        }

        self.writer
            .save(&outcome.recommendations, &self.writer.final_path())?;

        Ok(outcome)
    }
}
