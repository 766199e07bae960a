pub mod blending;
pub mod ensemble;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod popularity;
pub mod similarity;

pub use blending::{BlendingWeight, ResultBlender};
pub use ensemble::{EnsembleBuilder, EnsembleOutcome, Pool};
pub use loader::{CacheDirSource, HttpSource, Loader, ResultSetSource};
pub use pipeline::EnsembleService;
pub use popularity::PopularityTable;
pub use similarity::{SimilarityEngine, SimilarityMeasure};
